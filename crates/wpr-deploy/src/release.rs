//! Release naming.
//!
//! A release is named `release-<YYYYMMDD>-<id>`; its stored archive is the
//! same name with `.tar.gz` appended.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Prefix shared by release directories and stored archives.
pub const RELEASE_PREFIX: &str = "release-";

/// Suffix of stored archives.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

const DATE_FORMAT: &str = "%Y%m%d";

/// Name of one release directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseName {
    date: NaiveDate,
    id: String,
}

impl ReleaseName {
    /// Build a release name from a deploy date and a short identifier.
    #[must_use]
    pub fn new(date: NaiveDate, id: impl Into<String>) -> Self {
        Self {
            date,
            id: id.into(),
        }
    }

    /// Parse a directory name such as `release-20240131-1a2b3c4d`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(RELEASE_PREFIX)?;
        let (date, id) = rest.split_once('-')?;
        if id.is_empty() || id.contains(['/', '\\']) || id.ends_with(ARCHIVE_SUFFIX) {
            return None;
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some(Self::new(date, id))
    }

    /// Deploy date encoded in the name.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Short identifier encoded in the name.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// File name of the archive stored next to this release.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{self}{ARCHIVE_SUFFIX}")
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{RELEASE_PREFIX}{}-{}",
            self.date.format(DATE_FORMAT),
            self.id
        )
    }
}

impl Serialize for ReleaseName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether a directory entry name belongs to the release-directory set.
#[must_use]
pub fn is_release_dir_name(name: &str) -> bool {
    name.starts_with(RELEASE_PREFIX) && !name.ends_with(ARCHIVE_SUFFIX)
}

/// Whether a directory entry name belongs to the stored-archive set.
#[must_use]
pub fn is_release_archive_name(name: &str) -> bool {
    name.starts_with(RELEASE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX)
}
