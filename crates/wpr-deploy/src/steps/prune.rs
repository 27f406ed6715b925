//! Retention cleanup of old releases and archives.
//!
//! Release directories and stored archives are two independent sets, each
//! ordered newest first by modification time and cut down to `keep`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::error::{DeployError, Result};
use crate::fs_util::modified_no_follow;
use crate::release::{is_release_archive_name, is_release_dir_name};

/// One member of a retention set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionEntry {
    /// Directory entry name.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Modification time.
    pub modified: SystemTime,
}

/// What retention cleanup removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Release directories deleted.
    pub removed_releases: Vec<String>,
    /// Stored archives deleted.
    pub removed_archives: Vec<String>,
}

impl PruneReport {
    /// Whether nothing was removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed_releases.is_empty() && self.removed_archives.is_empty()
    }
}

/// Release directories and stored archives found in `releases_dir`,
/// each sorted newest first.
pub fn scan_releases(releases_dir: &Path) -> Result<(Vec<RetentionEntry>, Vec<RetentionEntry>)> {
    let mut releases = Vec::new();
    let mut archives = Vec::new();

    for entry in fs::read_dir(releases_dir).map_err(|e| DeployError::io(releases_dir, e))? {
        let entry = entry.map_err(|e| DeployError::io(releases_dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().map_err(|e| DeployError::io(&path, e))?;

        let set = if file_type.is_dir() && is_release_dir_name(&name) {
            &mut releases
        } else if file_type.is_file() && is_release_archive_name(&name) {
            &mut archives
        } else {
            continue;
        };
        let modified = modified_no_follow(&path).map_err(|e| DeployError::io(&path, e))?;
        set.push(RetentionEntry {
            name,
            path,
            modified,
        });
    }

    sort_newest_first(&mut releases);
    sort_newest_first(&mut archives);
    Ok((releases, archives))
}

/// Newest first; names break ties so the order is deterministic.
pub fn sort_newest_first(entries: &mut [RetentionEntry]) {
    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
}

/// Entries past the first `keep` of a newest-first list, minus `protect`.
#[must_use]
pub fn select_for_removal<'a>(
    sorted: &'a [RetentionEntry],
    keep: usize,
    protect: Option<&str>,
) -> Vec<&'a RetentionEntry> {
    sorted
        .iter()
        .skip(keep)
        .filter(|entry| Some(entry.name.as_str()) != protect)
        .collect()
}

/// Delete all but the `keep` newest release directories and archives.
///
/// `protect` names a release directory that is never removed (the active
/// release). A failure stops cleanup midway; the two sets are not
/// coordinated.
pub fn prune(releases_dir: &Path, keep: usize, protect: Option<&str>) -> Result<PruneReport> {
    let (releases, archives) = scan_releases(releases_dir)?;
    let mut report = PruneReport::default();

    for entry in select_for_removal(&releases, keep, protect) {
        tracing::info!("Removing old release {}", entry.name);
        fs::remove_dir_all(&entry.path).map_err(|e| DeployError::io(&entry.path, e))?;
        report.removed_releases.push(entry.name.clone());
    }

    for entry in select_for_removal(&archives, keep, None) {
        tracing::info!("Removing old archive {}", entry.name);
        fs::remove_file(&entry.path).map_err(|e| DeployError::io(&entry.path, e))?;
        report.removed_archives.push(entry.name.clone());
    }

    if report.is_empty() {
        tracing::debug!("Nothing to prune (keep={})", keep);
    }
    Ok(report)
}
