//! Buffer manager errors.

use std::fmt;

use crate::storage::StorageError;

/// Errors from the buffer manager and replacement policies.
#[derive(Debug)]
pub enum BufferError {
    /// Every cached page is pinned; eviction found no victim.
    BufferFull,
    /// A page that is not fixed was unfixed. Indicates a caller bug; the
    /// RAII guards make this unreachable in safe use.
    UnfixUnfixed,
    /// I/O failure from the storage layer.
    Storage(StorageError),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::BufferFull => write!(f, "buffer is full: all pages are pinned"),
            BufferError::UnfixUnfixed => write!(f, "unfix called on an unfixed page"),
            BufferError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for BufferError {
    fn from(e: StorageError) -> Self {
        BufferError::Storage(e)
    }
}
