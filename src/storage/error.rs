//! Storage layer errors.

use std::fmt;

use crate::storage::PageId;

/// Errors from file-level page I/O.
#[derive(Debug)]
pub enum StorageError {
    /// A page id past the end of the file was requested.
    OutOfRange {
        /// The requested page.
        page_id: PageId,
        /// Number of pages currently in the file.
        num_pages: u64,
    },
    /// Kernel-level I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::OutOfRange { page_id, num_pages } => {
                write!(
                    f,
                    "page {} out of range (file has {} pages)",
                    page_id, num_pages
                )
            }
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::OutOfRange { .. } => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
