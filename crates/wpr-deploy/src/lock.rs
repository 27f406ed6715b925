//! Exclusive lock on a releases directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{DeployError, Result};

/// Lock file name inside the releases directory.
pub const LOCK_FILE_NAME: &str = ".wp-release.lock";

/// Held advisory lock; released on drop.
#[derive(Debug)]
pub struct DeployLock {
    file: File,
    path: PathBuf,
}

impl DeployLock {
    /// Take the lock without waiting.
    ///
    /// Fails with [`DeployError::Locked`] when another process holds it.
    pub fn acquire(releases_dir: &Path) -> Result<Self> {
        let path = releases_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DeployError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            return Err(DeployError::Locked { path });
        }
        tracing::debug!("Acquired lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
