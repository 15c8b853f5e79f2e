//! Advisory lock ensuring a single writer per record log.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{MeetDirError, MeetDirResult};

/// Releases the lock when dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire an exclusive lock, failing if another writer holds it.
    pub fn acquire(path: &Path) -> MeetDirResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        file.try_lock_exclusive()
            .map_err(|_| MeetDirError::StoreLocked(path.display().to_string()))?;

        Ok(StoreLock {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
