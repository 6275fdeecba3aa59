//! Advisory file lock guarding one materialization target.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::{Error, Result};

/// Exclusive advisory lock held on a lock file next to the target directory.
///
/// The lock is released when the guard is dropped. The lock file itself is
/// left in place; deleting it would let a waiter lock a different inode.
#[derive(Debug)]
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
}

impl DirectoryLock {
    /// Block until the exclusive lock on `path` is held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] if the lock file cannot be opened or locked.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| Error::extraction_with_source(path, "unable to open lock file", e))?;

        trace!(?path, "Waiting for materialization lock");
        file.lock_exclusive()
            .map_err(|e| Error::extraction_with_source(path, "unable to acquire lock", e))?;
        trace!(?path, "Acquired materialization lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        let _ = FileExt::unlock(&self.file);
        trace!(path = ?self.path, "Released materialization lock");
    }
}
