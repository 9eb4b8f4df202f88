//! File manager: page-granular I/O on a single database file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::storage::{PageId, SlottedPage, StorageError, PAGE_SIZE};

/// Owns the database file handle and serializes all page I/O on it.
///
/// # File layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (4KB)     | Page 1 (4KB)     | Page 2 (4KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 4096      ^ offset 8192
/// ```
///
/// # Durability
///
/// `flush` writes through the OS file buffers but does not force data to the
/// storage medium (no fsync). That matches the engine's no-crash-recovery
/// scope.
pub struct FileManager {
    path: PathBuf,
    /// File handle behind a mutex; all seeks and transfers hold it.
    file: Mutex<File>,
    /// Number of pages currently in the file.
    num_pages: AtomicU64,
}

impl FileManager {
    /// Opens the database file, creating it if absent.
    ///
    /// With `truncate`, existing contents are discarded. A file with zero
    /// pages (new or truncated) is extended by one zero page so page 0
    /// always exists.
    ///
    /// # Errors
    ///
    /// Propagates `StorageError::Io` from the filesystem.
    pub fn open(path: impl AsRef<Path>, truncate: bool) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&path)?;

        let len = file.metadata()?.len();
        let manager = Self {
            path,
            file: Mutex::new(file),
            num_pages: AtomicU64::new(len / PAGE_SIZE as u64),
        };
        if manager.num_pages() == 0 {
            manager.extend()?;
        }
        Ok(manager)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages currently in the file.
    pub fn num_pages(&self) -> u64 {
        self.num_pages.load(Ordering::Acquire)
    }

    /// Reads a page from disk into a fresh [`SlottedPage`].
    ///
    /// # Errors
    ///
    /// Fails with `StorageError::OutOfRange` if `page_id` names a page past
    /// the end of the file; I/O failures surface as `StorageError::Io`.
    pub fn load(&self, page_id: PageId) -> Result<SlottedPage, StorageError> {
        let num_pages = self.num_pages();
        if page_id as u64 >= num_pages {
            return Err(StorageError::OutOfRange { page_id, num_pages });
        }

        let mut page = SlottedPage::new();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
        file.read_exact(page.bytes_mut().as_mut_slice())?;
        Ok(page)
    }

    /// Writes a page to its block and flushes OS buffers.
    ///
    /// # Errors
    ///
    /// Fails with `StorageError::OutOfRange` past the end of the file;
    /// I/O failures surface as `StorageError::Io`.
    pub fn flush(&self, page_id: PageId, page: &SlottedPage) -> Result<(), StorageError> {
        let num_pages = self.num_pages();
        if page_id as u64 >= num_pages {
            return Err(StorageError::OutOfRange { page_id, num_pages });
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
        file.write_all(page.bytes().as_slice())?;
        file.flush()?;
        Ok(())
    }

    /// Appends one zero page.
    pub fn extend(&self) -> Result<(), StorageError> {
        let mut file = self.file.lock();
        let num_pages = self.num_pages.load(Ordering::Acquire);
        file.seek(SeekFrom::Start(num_pages * PAGE_SIZE as u64))?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        file.flush()?;
        self.num_pages.store(num_pages + 1, Ordering::Release);
        debug!("extended {} to {} pages", self.path.display(), num_pages + 1);
        Ok(())
    }

    /// Appends zero pages until `page_id` is a valid page.
    ///
    /// No-op if the file already contains it.
    pub fn extend_to(&self, page_id: PageId) -> Result<(), StorageError> {
        let mut file = self.file.lock();
        let num_pages = self.num_pages.load(Ordering::Acquire);
        if (page_id as u64) < num_pages {
            return Ok(());
        }

        let add = page_id as u64 + 1 - num_pages;
        file.seek(SeekFrom::Start(num_pages * PAGE_SIZE as u64))?;
        for _ in 0..add {
            file.write_all(&[0u8; PAGE_SIZE])?;
        }
        file.flush()?;
        self.num_pages.store(page_id as u64 + 1, Ordering::Release);
        debug!(
            "extended {} to {} pages",
            self.path.display(),
            page_id as u64 + 1
        );
        Ok(())
    }
}
