//! Integration tests for the backend contract and its two concrete sources.

use std::io::Write;

use tempfile::NamedTempFile;

use datasource_cache::backend::{
    ArrayBackend, Backend, Capabilities, CsvBackend, CsvOptions, Description, RecordIter,
};
use datasource_cache::error::{CapabilityError, DataError, Result};

fn latency_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"host;latency_ms\nalpha;12\nbeta;7\ngamma;31\n").unwrap();
    file.flush().unwrap();
    file
}

fn semicolon() -> CsvOptions {
    CsvOptions {
        delimiter: b';',
        batch_size: 2,
        ..Default::default()
    }
}

/// A backend that only implements the mandatory operations.
struct Countdown {
    from: u32,
    description: Description,
}

impl Backend for Countdown {
    type Record = u32;

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENTIAL
    }

    fn description(&self) -> &Description {
        &self.description
    }

    fn default_batch_size(&self) -> usize {
        3
    }

    fn iterate(&self) -> Result<RecordIter<'_, u32>> {
        Ok(Box::new((0..self.from).rev().map(Ok::<u32, DataError>)))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.from as usize)
    }
}

#[test]
fn test_csv_iteration_is_restartable() {
    let file = latency_csv();
    let backend = CsvBackend::open(file.path(), semicolon()).unwrap();

    let first: Vec<_> = backend.iterate().unwrap().map(|r| r.unwrap()).collect();
    let second: Vec<_> = backend.iterate().unwrap().map(|r| r.unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0], vec!["alpha".to_string(), "12".to_string()]);
}

#[test]
fn test_csv_interleaved_iterators_do_not_share_a_cursor() {
    let file = latency_csv();
    let backend = CsvBackend::open(file.path(), semicolon()).unwrap();

    let mut a = backend.iterate().unwrap();
    let mut b = backend.iterate().unwrap();
    a.next();
    a.next();
    assert_eq!(b.next().unwrap().unwrap()[0], "alpha");
    assert_eq!(a.next().unwrap().unwrap()[0], "gamma");
}

#[test]
fn test_csv_metadata() {
    let file = latency_csv();
    let backend = CsvBackend::open(file.path(), semicolon()).unwrap();

    assert_eq!(backend.capabilities(), Capabilities::SEQUENTIAL);
    assert_eq!(backend.description().to_string(), "fields: host, latency_ms");
    assert_eq!(backend.len().unwrap(), 3);
    assert_eq!(backend.default_batch_size(), 2);

    let sizes: Vec<usize> = backend.batches(None).unwrap().map(|b| b.unwrap().len()).collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[test]
fn test_csv_missing_file() {
    let err = CsvBackend::open("/nonexistent/data.csv", CsvOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, DataError::Csv(_)));
}

#[test]
fn test_default_operations_report_missing_capability() {
    let mut backend = Countdown {
        from: 4,
        description: Description::Fields { names: vec![] },
    };

    assert_eq!(
        backend.at(0).unwrap_err().capability(),
        Some(CapabilityError::RandomAccessNotSupported)
    );
    assert_eq!(
        backend.set(0, 1).unwrap_err().capability(),
        Some(CapabilityError::WriteNotSupported)
    );
    assert_eq!(
        backend.delete(0).unwrap_err().capability(),
        Some(CapabilityError::WriteNotSupported)
    );
    assert_eq!(
        backend.scatter(&[(0, 1)]).unwrap_err().capability(),
        Some(CapabilityError::WriteNotSupported)
    );
    assert_eq!(
        backend.next_records(1).unwrap_err().capability(),
        Some(CapabilityError::StreamNotSupported)
    );

    let batches: Vec<Vec<u32>> = backend
        .batches(None)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(batches, vec![vec![3, 2, 1], vec![0]]);
}

#[test]
fn test_array_read_your_writes() {
    let mut backend = ArrayBackend::new(vec!["a".to_string(), "b".to_string()]);
    backend.scatter(&[(1, "z".to_string())]).unwrap();
    assert_eq!(backend.gather(&[1, 0]).unwrap(), vec!["z", "a"]);

    backend.set(0, "y".to_string()).unwrap();
    let all: Vec<String> = backend.iterate().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(all, vec!["y", "z"]);
}
