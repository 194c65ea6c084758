//! Record backends.
//!
//! A backend is a record store tagged with four capability flags. The
//! [`Backend`] trait exposes every operation a store can offer; operations a
//! store cannot support fail with the [`CapabilityError`] naming the missing
//! flag instead of being absent.
//!
//! - [`delimited`]: stream-only delimited text file ([`CsvBackend`])
//! - [`array`]: in-memory random-access array ([`ArrayBackend`])

pub mod array;
pub mod delimited;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, DataError, Result};

pub use array::ArrayBackend;
pub use delimited::{CsvBackend, CsvOptions, TextRecord};

/// Record identifier: the record's position in the backend.
pub type Key = usize;

/// Lazy, finite sequence of records.
pub type RecordIter<'a, R> = Box<dyn Iterator<Item = Result<R>> + 'a>;

/// Lazy sequence of record groups.
pub type BatchIter<'a, R> = Box<dyn Iterator<Item = Result<Vec<R>>> + 'a>;

/// The four capability flags of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    /// Sequential source: no seeks, records come from a cursor.
    pub stream: bool,
    /// Arbitrary indexing by key.
    pub random_access: bool,
    pub readable: bool,
    pub writable: bool,
}

impl Capabilities {
    /// Read-only sequential source.
    pub const SEQUENTIAL: Capabilities = Capabilities {
        stream: true,
        random_access: false,
        readable: true,
        writable: false,
    };

    /// Fully indexable read/write store.
    pub const RANDOM_ACCESS: Capabilities = Capabilities {
        stream: false,
        random_access: true,
        readable: true,
        writable: true,
    };

    /// Indexable store that rejects writes.
    pub const READ_ONLY: Capabilities = Capabilities {
        stream: false,
        random_access: true,
        readable: true,
        writable: false,
    };

    pub fn require_read(self) -> Result<(), CapabilityError> {
        if self.readable {
            Ok(())
        } else {
            Err(CapabilityError::ReadNotSupported)
        }
    }

    pub fn require_write(self) -> Result<(), CapabilityError> {
        if self.writable {
            Ok(())
        } else {
            Err(CapabilityError::WriteNotSupported)
        }
    }

    pub fn require_random_access(self) -> Result<(), CapabilityError> {
        if self.random_access {
            Ok(())
        } else {
            Err(CapabilityError::RandomAccessNotSupported)
        }
    }

    pub fn require_stream(self) -> Result<(), CapabilityError> {
        if self.stream {
            Ok(())
        } else {
            Err(CapabilityError::StreamNotSupported)
        }
    }

    /// Checks for indexed reads (`at`, `gather`).
    pub fn require_indexed_read(self) -> Result<(), CapabilityError> {
        self.require_read()?;
        self.require_random_access()
    }

    /// Checks for indexed writes (`set`, `scatter`, `delete`).
    /// Write is checked first so read-only streams report the write.
    pub fn require_indexed_write(self) -> Result<(), CapabilityError> {
        self.require_write()?;
        self.require_random_access()
    }
}

/// Static metadata describing a backend, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Description {
    /// Field names of a delimited source (empty without a header row).
    Fields { names: Vec<String> },
    /// Shape and element type of an in-memory array.
    Array {
        len: usize,
        element_type: &'static str,
    },
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Fields { names } if names.is_empty() => write!(f, "fields: (none)"),
            Description::Fields { names } => write!(f, "fields: {}", names.join(", ")),
            Description::Array { len, element_type } => {
                write!(f, "array of {len} records, element type {element_type}")
            }
        }
    }
}

/// A capability-checked record store.
///
/// Only the capability flags, the description and the readable operations
/// are mandatory. Every other operation has a default that fails with the
/// capability error a backend lacking it must report.
pub trait Backend {
    type Record: Clone;

    fn capabilities(&self) -> Capabilities;

    fn description(&self) -> &Description;

    /// Group size used by [`Backend::batches`] when none is given.
    fn default_batch_size(&self) -> usize;

    /// Records in source order. Each call starts over from the beginning.
    fn iterate(&self) -> Result<RecordIter<'_, Self::Record>>;

    /// Records in groups of `size` (or the default batch size). The final
    /// group may be shorter; no empty group is ever produced.
    fn batches(&self, size: Option<usize>) -> Result<BatchIter<'_, Self::Record>> {
        self.capabilities().require_read()?;
        let size = size.unwrap_or_else(|| self.default_batch_size());
        Ok(Box::new(Batches::new(self.iterate()?, size)?))
    }

    /// Total number of records.
    fn len(&self) -> Result<usize>;

    fn at(&self, _key: Key) -> Result<Self::Record> {
        self.capabilities().require_indexed_read()?;
        Err(CapabilityError::RandomAccessNotSupported.into())
    }

    fn set(&mut self, _key: Key, _value: Self::Record) -> Result<()> {
        self.capabilities().require_indexed_write()?;
        Err(CapabilityError::WriteNotSupported.into())
    }

    fn delete(&mut self, _key: Key) -> Result<()> {
        self.capabilities().require_indexed_write()?;
        Err(CapabilityError::WriteNotSupported.into())
    }

    /// Values for `keys` in the order given, duplicates included. Stops at
    /// the first failing key.
    fn gather(&self, keys: &[Key]) -> Result<Vec<Self::Record>> {
        self.capabilities().require_indexed_read()?;
        keys.iter().map(|&key| self.at(key)).collect()
    }

    /// Writes every `(key, value)` pair in order. Stops at the first
    /// failing key.
    fn scatter(&mut self, pairs: &[(Key, Self::Record)]) -> Result<()> {
        self.capabilities().require_indexed_write()?;
        for (key, value) in pairs {
            self.set(*key, value.clone())?;
        }
        Ok(())
    }

    /// Pulls up to `n` records from the backend's streaming cursor, tagged
    /// with their stream position. Returns [`DataError::Exhausted`] once the
    /// cursor has nothing left.
    fn next_records(&mut self, _n: usize) -> Result<Vec<(Key, Self::Record)>> {
        Err(CapabilityError::StreamNotSupported.into())
    }

    /// Moves the streaming cursor back to the start of the source.
    fn rewind(&mut self) {}
}

/// Groups an inner record sequence into fixed-size batches.
///
/// The inner iterator's `None` is the only end-of-source signal. An inner
/// error is yielded as-is and ends the sequence.
pub struct Batches<I> {
    inner: I,
    size: usize,
    done: bool,
}

impl<I> Batches<I> {
    pub fn new(inner: I, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(DataError::invalid("batch size must be at least 1"));
        }
        Ok(Self {
            inner,
            size,
            done: false,
        })
    }
}

impl<I, R> Iterator for Batches<I>
where
    I: Iterator<Item = Result<R>>,
{
    type Item = Result<Vec<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(Ok(record)) => batch.push(record),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
