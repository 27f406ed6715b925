//! Error types for the deployment pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while deploying, listing, or rolling back releases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeployError {
    /// The input archive does not exist.
    #[error("archive not found: {}", path.display())]
    ArchiveNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The target release directory already exists.
    #[error("release directory already exists: {}", path.display())]
    ReleaseExists {
        /// Existing release directory.
        path: PathBuf,
    },

    /// Another deployment holds the releases lock.
    #[error("another deployment is in progress (lock held on {})", path.display())]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },

    /// The archive digest does not match the expected value.
    #[error("checksum verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected SHA256 hash.
        expected: String,
        /// Actual SHA256 hash of the archive.
        actual: String,
    },

    /// Unpacking the archive failed.
    #[error("archive extraction error: {0}")]
    Extraction(String),

    /// A post-extraction hook failed.
    #[error("hook '{hook}' failed: {message}")]
    HookFailed {
        /// Hook name.
        hook: String,
        /// What went wrong.
        message: String,
    },

    /// `current-release` exists but is not a symlink.
    #[error("refusing to replace non-symlink at {}", path.display())]
    ActivationBlocked {
        /// Path of the blocking entry.
        path: PathBuf,
    },

    /// An archive with the release name is already stored.
    #[error("archive already stored at {}", path.display())]
    ArchiveExists {
        /// Existing archive path.
        path: PathBuf,
    },

    /// A named release is not present in the releases directory.
    #[error("release not found: {0}")]
    ReleaseNotFound(String),

    /// Rollback was requested but no older release exists.
    #[error("no release older than {0} to roll back to")]
    NoRollbackTarget(String),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being operated on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn hook(hook: &str, message: impl Into<String>) -> Self {
        Self::HookFailed {
            hook: hook.to_string(),
            message: message.into(),
        }
    }

    /// Returns whether the failure happened before anything was written.
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound { .. }
                | Self::Locked { .. }
                | Self::ActivationBlocked { .. }
                | Self::Config(_)
                | Self::ChecksumMismatch { .. }
        )
    }
}

impl From<toml::de::Error> for DeployError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_paths() {
        let err = DeployError::ReleaseExists {
            path: PathBuf::from("/srv/releases/release-20240101-abcd1234"),
        };
        assert!(err.to_string().contains("release-20240101-abcd1234"));

        let err = DeployError::hook("relocate", "source missing");
        assert_eq!(err.to_string(), "hook 'relocate' failed: source missing");
    }

    #[test]
    fn test_preflight() {
        assert!(
            DeployError::ArchiveNotFound {
                path: PathBuf::from("release.tar.gz")
            }
            .is_preflight()
        );
        assert!(!DeployError::Extraction("bad gzip header".to_string()).is_preflight());
    }
}
