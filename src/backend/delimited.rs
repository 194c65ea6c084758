//! Sequential delimited-text backend.
//!
//! Rows are read with the `csv` crate and decoded as UTF-8 text. The file is
//! reopened for every iteration, so iterations never share a cursor. The
//! streaming cursor used by [`Backend::next_records`] is separate and lives
//! until [`Backend::rewind`].

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use tracing::{debug, warn};

use crate::backend::{Backend, Capabilities, Description, Key, RecordIter};
use crate::config::SourceConfig;
use crate::error::{DataError, Result};

/// One parsed row.
pub type TextRecord = Vec<String>;

/// How a delimited file is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// First row holds field names and is not a data record.
    pub has_header: bool,
    pub delimiter: u8,
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            batch_size: 100,
        }
    }
}

impl TryFrom<&SourceConfig> for CsvOptions {
    type Error = DataError;

    fn try_from(config: &SourceConfig) -> Result<Self> {
        if !config.delimiter.is_ascii() {
            return Err(DataError::invalid(format!(
                "delimiter {:?} is not a single-byte character",
                config.delimiter
            )));
        }
        Ok(Self {
            has_header: config.has_header,
            delimiter: config.delimiter as u8,
            batch_size: config.batch_size,
        })
    }
}

struct StreamCursor {
    records: StringRecordsIntoIter<File>,
    /// Position of the next row the reader yields, failed rows included.
    position: Key,
    /// Row error hit after records were already pulled; reported on the next call.
    pending: Option<csv::Error>,
}

/// Stream-only, read-only backend over a delimited text file.
pub struct CsvBackend {
    path: PathBuf,
    options: CsvOptions,
    description: Description,
    cursor: Option<StreamCursor>,
}

impl CsvBackend {
    /// Open `path`, reading the header row (if configured) for the description.
    pub fn open(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut backend = Self {
            path,
            options,
            description: Description::Fields { names: Vec::new() },
            cursor: None,
        };

        if backend.options.has_header {
            let mut reader = backend.reader()?;
            let names = reader
                .headers()?
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    if i == 0 {
                        name.trim_start_matches('\u{feff}').to_owned()
                    } else {
                        name.to_owned()
                    }
                })
                .collect();
            backend.description = Description::Fields { names };
        }

        debug!(path = %backend.path.display(), description = %backend.description, "Opened delimited source");
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream position of the next record [`Backend::next_records`] returns.
    pub fn position(&self) -> Key {
        self.cursor.as_ref().map_or(0, |c| c.position)
    }

    fn reader(&self) -> Result<csv::Reader<File>> {
        let reader = ReaderBuilder::new()
            .has_headers(self.options.has_header)
            .delimiter(self.options.delimiter)
            .flexible(true)
            .from_path(&self.path)?;
        Ok(reader)
    }
}

fn to_text_record(record: &StringRecord) -> TextRecord {
    record.iter().map(str::to_owned).collect()
}

impl Backend for CsvBackend {
    type Record = TextRecord;

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENTIAL
    }

    fn description(&self) -> &Description {
        &self.description
    }

    fn default_batch_size(&self) -> usize {
        self.options.batch_size
    }

    fn iterate(&self) -> Result<RecordIter<'_, TextRecord>> {
        let records = self
            .reader()?
            .into_records()
            .map(|row| row.map(|r| to_text_record(&r)).map_err(DataError::from));
        Ok(Box::new(records))
    }

    /// Full scan; data rows only.
    fn len(&self) -> Result<usize> {
        self.iterate()?
            .try_fold(0, |count, row| row.map(|_| count + 1))
    }

    fn next_records(&mut self, n: usize) -> Result<Vec<(Key, TextRecord)>> {
        if self.cursor.is_none() {
            let records = self.reader()?.into_records();
            self.cursor = Some(StreamCursor {
                records,
                position: 0,
                pending: None,
            });
            debug!(path = %self.path.display(), "Opened streaming cursor");
        }
        let cursor = self.cursor.as_mut().ok_or(DataError::Exhausted)?;
        if let Some(err) = cursor.pending.take() {
            return Err(err.into());
        }

        let mut pulled = Vec::with_capacity(n);
        while pulled.len() < n {
            let Some(row) = cursor.records.next() else {
                break;
            };
            let position = cursor.position;
            cursor.position += 1;
            match row {
                Ok(record) => pulled.push((position, to_text_record(&record))),
                Err(err) if pulled.is_empty() => return Err(err.into()),
                Err(err) => {
                    warn!(position, error = %err, "Unreadable row, returning rows pulled so far");
                    cursor.pending = Some(err);
                    break;
                }
            }
        }

        if pulled.is_empty() && n > 0 {
            return Err(DataError::Exhausted);
        }
        Ok(pulled)
    }

    fn rewind(&mut self) {
        self.cursor = None;
    }
}
