//! Atomic switch of the current-release symlink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::fs_util::create_symlink;

/// Point `link` at `target`, replacing any previous symlink atomically.
///
/// A temporary symlink is created next to `link` and renamed over it, so
/// readers resolve either the old or the new target.
pub fn activate(link: &Path, target: &Path) -> Result<()> {
    ensure_replaceable(link)?;

    let staging = staging_link_path(link);
    if fs::symlink_metadata(&staging).is_ok() {
        fs::remove_file(&staging).map_err(|e| DeployError::io(&staging, e))?;
    }
    create_symlink(target, &staging).map_err(|e| DeployError::io(&staging, e))?;

    if let Err(e) = fs::rename(&staging, link) {
        let _ = fs::remove_file(&staging);
        return Err(DeployError::io(link, e));
    }

    tracing::info!("Activated {} -> {}", link.display(), target.display());
    Ok(())
}

/// Check that `link` is absent or a symlink, so [`activate`] may replace it.
pub fn ensure_replaceable(link: &Path) -> Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if !meta.file_type().is_symlink() => Err(DeployError::ActivationBlocked {
            path: link.to_path_buf(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DeployError::io(link, e)),
    }
}

/// Name of the release `link` points at, if it is a symlink.
pub fn current_release_name(link: &Path) -> Result<Option<String>> {
    match fs::read_link(link) {
        Ok(target) => Ok(target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::InvalidInput) => {
            Ok(None)
        }
        Err(e) => Err(DeployError::io(link, e)),
    }
}

fn staging_link_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    link.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}
