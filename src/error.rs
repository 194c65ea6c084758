//! Error types shared by backends, caches and the data source.
//!
//! Capability violations get their own enum so callers can match on exactly
//! which capability was missing; everything else is a [`DataError`].

use std::fmt::Debug;

use thiserror::Error;

/// A backend was asked to do something its capability flags rule out.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("read not supported")]
    ReadNotSupported,

    #[error("write not supported")]
    WriteNotSupported,

    #[error("random access not supported")]
    RandomAccessNotSupported,

    #[error("streaming not supported")]
    StreamNotSupported,
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("key {key} not found in cache")]
    NotFound { key: String },

    #[error("index {index} out of range for {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    /// Terminal signal of a streaming cursor: nothing left to read.
    #[error("stream exhausted")]
    Exhausted,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data source lock poisoned")]
    LockPoisoned,
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;

impl DataError {
    /// Cache miss for `key`.
    pub fn not_found<K: Debug>(key: &K) -> Self {
        DataError::NotFound {
            key: format!("{key:?}"),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DataError::InvalidArgument(msg.into())
    }

    /// The missing capability, if this is a capability violation.
    pub fn capability(&self) -> Option<CapabilityError> {
        match self {
            DataError::Capability(c) => Some(*c),
            _ => None,
        }
    }

    /// True for cache misses and out-of-range backend keys.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DataError::NotFound { .. } | DataError::IndexOutOfRange { .. }
        )
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, DataError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_messages_name_the_capability() {
        assert_eq!(
            CapabilityError::WriteNotSupported.to_string(),
            "write not supported"
        );
        let err: DataError = CapabilityError::RandomAccessNotSupported.into();
        assert_eq!(err.to_string(), "random access not supported");
        assert_eq!(
            err.capability(),
            Some(CapabilityError::RandomAccessNotSupported)
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(DataError::not_found(&7usize).is_not_found());
        assert!(DataError::IndexOutOfRange { index: 3, len: 2 }.is_not_found());
        assert!(!DataError::Exhausted.is_not_found());
        assert!(DataError::Exhausted.is_exhausted());
        assert_eq!(
            DataError::not_found(&"abc").to_string(),
            "key \"abc\" not found in cache"
        );
    }
}
