//! Storing the source archive next to its release.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::fs_util::move_file;

/// Move `archive` into `releases_dir` under `file_name`.
///
/// Refuses to overwrite an archive already stored under that name.
pub fn store_archive(archive: &Path, releases_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let dest = releases_dir.join(file_name);
    if fs::symlink_metadata(&dest).is_ok() {
        return Err(DeployError::ArchiveExists { path: dest });
    }
    move_file(archive, &dest).map_err(|e| DeployError::io(archive, e))?;
    tracing::info!("Stored archive as {}", dest.display());
    Ok(dest)
}
