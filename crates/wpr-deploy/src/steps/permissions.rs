//! Permission normalization for an extracted release.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{DeployError, Result};

/// Number of entries whose mode was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    /// Directories, including the release root.
    pub dirs: usize,
    /// Regular files.
    pub files: usize,
}

/// Set `dir_mode` on `root` and every directory below it, `file_mode` on
/// every regular file. Symlinks are neither followed nor changed.
#[cfg(unix)]
pub fn normalize_permissions(root: &Path, dir_mode: u32, file_mode: u32) -> Result<PermissionSummary> {
    use std::os::unix::fs::PermissionsExt;

    let mut summary = PermissionSummary::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        fs::set_permissions(&dir, fs::Permissions::from_mode(dir_mode))
            .map_err(|e| DeployError::io(&dir, e))?;
        summary.dirs += 1;

        for entry in fs::read_dir(&dir).map_err(|e| DeployError::io(&dir, e))? {
            let entry = entry.map_err(|e| DeployError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| DeployError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                fs::set_permissions(&path, fs::Permissions::from_mode(file_mode))
                    .map_err(|e| DeployError::io(&path, e))?;
                summary.files += 1;
            }
        }
    }

    tracing::info!(
        "Normalized permissions: {} dirs ({:o}), {} files ({:o})",
        summary.dirs,
        dir_mode,
        summary.files,
        file_mode
    );
    Ok(summary)
}

/// Modes are a POSIX concept; elsewhere the tree is left as extracted.
#[cfg(not(unix))]
pub fn normalize_permissions(root: &Path, _dir_mode: u32, _file_mode: u32) -> Result<PermissionSummary> {
    tracing::info!(
        "Skipping permission normalization for {} on this platform",
        root.display()
    );
    Ok(PermissionSummary::default())
}
