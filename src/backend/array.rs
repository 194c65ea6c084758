//! In-memory random-access backend.
//!
//! Keys are indices along the first axis. The array has a fixed length:
//! records can be overwritten but not removed.

use crate::backend::{
    Backend, BatchIter, Capabilities, Description, Key, RecordIter,
};
use crate::error::{DataError, Result};

const DEFAULT_BATCH_SIZE: usize = 100;

/// Random-access backend over a vector of records.
#[derive(Debug, Clone)]
pub struct ArrayBackend<T> {
    rows: Vec<T>,
    batch_size: usize,
    capabilities: Capabilities,
    description: Description,
}

impl<T> ArrayBackend<T> {
    /// Readable and writable array.
    pub fn new(rows: Vec<T>) -> Self {
        Self::with_capabilities(rows, Capabilities::RANDOM_ACCESS)
    }

    /// Array that rejects every write.
    pub fn read_only(rows: Vec<T>) -> Self {
        Self::with_capabilities(rows, Capabilities::READ_ONLY)
    }

    fn with_capabilities(rows: Vec<T>, capabilities: Capabilities) -> Self {
        let description = Description::Array {
            len: rows.len(),
            element_type: std::any::type_name::<T>(),
        };
        Self {
            rows,
            batch_size: DEFAULT_BATCH_SIZE,
            capabilities,
            description,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn as_slice(&self) -> &[T] {
        &self.rows
    }

    pub fn into_inner(self) -> Vec<T> {
        self.rows
    }

    fn check_index(&self, key: Key) -> Result<()> {
        if key < self.rows.len() {
            Ok(())
        } else {
            Err(DataError::IndexOutOfRange {
                index: key,
                len: self.rows.len(),
            })
        }
    }
}

impl<T: Clone> Backend for ArrayBackend<T> {
    type Record = T;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn description(&self) -> &Description {
        &self.description
    }

    fn default_batch_size(&self) -> usize {
        self.batch_size
    }

    fn iterate(&self) -> Result<RecordIter<'_, T>> {
        self.capabilities.require_read()?;
        Ok(Box::new(self.rows.iter().cloned().map(Ok::<T, DataError>)))
    }

    fn batches(&self, size: Option<usize>) -> Result<BatchIter<'_, T>> {
        self.capabilities.require_read()?;
        let size = size.unwrap_or(self.batch_size);
        if size == 0 {
            return Err(DataError::invalid("batch size must be at least 1"));
        }
        Ok(Box::new(
            self.rows
                .chunks(size)
                .map(|chunk| Ok::<_, DataError>(chunk.to_vec())),
        ))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn at(&self, key: Key) -> Result<T> {
        self.capabilities.require_indexed_read()?;
        self.check_index(key)?;
        Ok(self.rows[key].clone())
    }

    fn set(&mut self, key: Key, value: T) -> Result<()> {
        self.capabilities.require_indexed_write()?;
        self.check_index(key)?;
        self.rows[key] = value;
        Ok(())
    }

    fn delete(&mut self, key: Key) -> Result<()> {
        self.capabilities.require_indexed_write()?;
        self.check_index(key)?;
        Err(DataError::invalid(
            "fixed-length array does not support deleting records",
        ))
    }

    /// Validates every key before writing anything.
    fn scatter(&mut self, pairs: &[(Key, T)]) -> Result<()> {
        self.capabilities.require_indexed_write()?;
        for (key, _) in pairs {
            self.check_index(*key)?;
        }
        for (key, value) in pairs {
            self.rows[*key] = value.clone();
        }
        Ok(())
    }
}
