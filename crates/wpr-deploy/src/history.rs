//! Release history: listing and rollback target selection.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::error::{DeployError, Result};
use crate::steps::activate::current_release_name;
use crate::steps::prune::scan_releases;

/// One release directory as seen by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseEntry {
    /// Directory name.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Modification time in seconds since the Unix epoch.
    pub modified_unix: i64,
    /// Whether the current-release link points here.
    pub is_current: bool,
    /// Whether the matching `.tar.gz` is still stored.
    pub archive_present: bool,
}

/// Releases in `releases_dir`, newest first.
///
/// A missing releases directory yields an empty history.
pub fn list_releases(releases_dir: &Path, current_link: &Path) -> Result<Vec<ReleaseEntry>> {
    if !releases_dir.is_dir() {
        return Ok(Vec::new());
    }
    let current = current_release_name(current_link)?;
    let (releases, archives) = scan_releases(releases_dir)?;

    Ok(releases
        .into_iter()
        .map(|entry| {
            let archive_name = format!("{}{}", entry.name, crate::release::ARCHIVE_SUFFIX);
            let modified_unix = entry
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
                .unwrap_or(0);
            ReleaseEntry {
                is_current: current.as_deref() == Some(entry.name.as_str()),
                archive_present: archives.iter().any(|a| a.name == archive_name),
                name: entry.name,
                path: entry.path,
                modified_unix,
            }
        })
        .collect())
}

/// Pick the release a rollback should activate.
///
/// With `to`, that release must exist and differ from the active one.
/// Without it, the release just older than the active one is chosen.
pub fn rollback_target<'a>(history: &'a [ReleaseEntry], to: Option<&str>) -> Result<&'a ReleaseEntry> {
    let current_index = history.iter().position(|entry| entry.is_current);

    if let Some(name) = to {
        let target = history
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| DeployError::ReleaseNotFound(name.to_string()))?;
        if target.is_current {
            return Err(DeployError::Config(format!("{name} is already the current release")));
        }
        return Ok(target);
    }

    let Some(index) = current_index else {
        return Err(DeployError::ReleaseNotFound(
            "no current release is active".to_string(),
        ));
    };
    history
        .get(index + 1)
        .ok_or_else(|| DeployError::NoRollbackTarget(history[index].name.clone()))
}
