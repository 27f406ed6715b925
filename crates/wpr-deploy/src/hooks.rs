//! Post-extraction hooks.
//!
//! Hooks adjust a freshly extracted release before permissions are
//! normalized and the release is activated. The stock list creates the
//! shared config symlink and moves ACF Pro into `mu-plugins`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::fs_util::create_symlink;

/// A step run against an extracted release directory.
pub trait ReleaseHook {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Human-readable description of what the hook does.
    fn describe(&self) -> String;

    /// Apply the hook to `release_dir`.
    fn run(&self, release_dir: &Path) -> Result<()>;
}

/// Serializable hook definition, as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum HookSpec {
    /// Create `link` inside the release pointing at `target`.
    SharedLink {
        /// Link path relative to the release root.
        link: String,
        /// Symlink target, stored verbatim (usually relative).
        target: String,
    },
    /// Move `from` to `to`, both relative to the release root.
    Relocate {
        /// Existing path inside the release.
        from: String,
        /// New path inside the release.
        to: String,
    },
}

impl HookSpec {
    /// The WordPress fixups applied to every release by default.
    #[must_use]
    pub fn wordpress_defaults() -> Vec<Self> {
        vec![
            Self::SharedLink {
                link: "config".to_string(),
                target: "../../config".to_string(),
            },
            Self::Relocate {
                from: "wp-content/plugins/advanced-custom-fields-pro".to_string(),
                to: "wp-content/mu-plugins/advanced-custom-fields-pro".to_string(),
            },
        ]
    }

    /// Reject definitions that would escape the release directory.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::SharedLink { link, target } => {
                check_inner_path("shared_link.link", link)?;
                if target.trim().is_empty() {
                    return Err(DeployError::Config(
                        "shared_link.target must not be empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Relocate { from, to } => {
                check_inner_path("relocate.from", from)?;
                check_inner_path("relocate.to", to)
            }
        }
    }

    /// Instantiate the hook.
    #[must_use]
    pub fn build(&self) -> Box<dyn ReleaseHook> {
        match self {
            Self::SharedLink { link, target } => Box::new(SharedConfigLink {
                link: PathBuf::from(link),
                target: PathBuf::from(target),
            }),
            Self::Relocate { from, to } => Box::new(RelocateDir {
                from: PathBuf::from(from),
                to: PathBuf::from(to),
            }),
        }
    }
}

fn check_inner_path(field: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if value.trim().is_empty() || escapes {
        return Err(DeployError::Config(format!(
            "{field} must be a relative path inside the release, got '{value}'"
        )));
    }
    Ok(())
}

/// Symlink from inside the release to a directory shared by all releases.
#[derive(Debug, Clone)]
pub struct SharedConfigLink {
    link: PathBuf,
    target: PathBuf,
}

impl ReleaseHook for SharedConfigLink {
    fn name(&self) -> &'static str {
        "shared_link"
    }

    fn describe(&self) -> String {
        format!("link {} -> {}", self.link.display(), self.target.display())
    }

    fn run(&self, release_dir: &Path) -> Result<()> {
        let link = release_dir.join(&self.link);
        if fs::symlink_metadata(&link).is_ok() {
            return Err(DeployError::hook(
                self.name(),
                format!("{} already exists in the archive", self.link.display()),
            ));
        }
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
        }
        create_symlink(&self.target, &link).map_err(|e| DeployError::io(&link, e))?;
        debug!("Linked {} -> {}", link.display(), self.target.display());
        Ok(())
    }
}

/// Move a directory within the release tree.
#[derive(Debug, Clone)]
pub struct RelocateDir {
    from: PathBuf,
    to: PathBuf,
}

impl ReleaseHook for RelocateDir {
    fn name(&self) -> &'static str {
        "relocate"
    }

    fn describe(&self) -> String {
        format!("move {} -> {}", self.from.display(), self.to.display())
    }

    fn run(&self, release_dir: &Path) -> Result<()> {
        let from = release_dir.join(&self.from);
        let to = release_dir.join(&self.to);

        match fs::symlink_metadata(&from) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DeployError::hook(
                    self.name(),
                    format!("{} not found in the archive", self.from.display()),
                ));
            }
            Err(e) => return Err(DeployError::io(&from, e)),
        }
        if fs::symlink_metadata(&to).is_ok() {
            return Err(DeployError::hook(
                self.name(),
                format!("{} already exists", self.to.display()),
            ));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
        }
        fs::rename(&from, &to).map_err(|e| DeployError::io(&from, e))?;
        debug!("Moved {} -> {}", from.display(), to.display());
        Ok(())
    }
}

/// Run every hook in order, stopping at the first failure.
///
/// Returns the descriptions of the hooks that ran.
pub fn run_hooks(hooks: &[Box<dyn ReleaseHook>], release_dir: &Path) -> Result<Vec<String>> {
    let mut applied = Vec::with_capacity(hooks.len());
    for hook in hooks {
        let description = hook.describe();
        tracing::info!("Running hook {}: {}", hook.name(), description);
        hook.run(release_dir)?;
        applied.push(description);
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir
            .path()
            .join("wp-content/plugins/advanced-custom-fields-pro");
        fs::create_dir_all(&plugin).unwrap();
        fs::write(plugin.join("acf.php"), "<?php").unwrap();
        fs::create_dir_all(dir.path().join("wp-content/mu-plugins")).unwrap();
        dir
    }

    #[test]
    fn test_relocate_moves_plugin() {
        let dir = plugin_tree();
        let hooks: Vec<_> = HookSpec::wordpress_defaults()
            .iter()
            .map(HookSpec::build)
            .collect();
        let applied = run_hooks(&hooks, dir.path()).unwrap();
        assert_eq!(applied.len(), 2);

        let root = dir.path();
        assert!(
            root.join("wp-content/mu-plugins/advanced-custom-fields-pro/acf.php")
                .is_file()
        );
        assert!(
            !root
                .join("wp-content/plugins/advanced-custom-fields-pro")
                .exists()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shared_link_is_relative() {
        let dir = plugin_tree();
        SharedConfigLink {
            link: PathBuf::from("config"),
            target: PathBuf::from("../../config"),
        }
        .run(dir.path())
        .unwrap();
        let target = fs::read_link(dir.path().join("config")).unwrap();
        assert_eq!(target, PathBuf::from("../../config"));
    }

    #[test]
    fn test_relocate_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let hook = HookSpec::Relocate {
            from: "wp-content/plugins/advanced-custom-fields-pro".to_string(),
            to: "wp-content/mu-plugins/advanced-custom-fields-pro".to_string(),
        }
        .build();
        let err = hook.run(dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::HookFailed { .. }));
    }

    #[test]
    fn test_relocate_creates_destination_parent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let hook = HookSpec::Relocate {
            from: "a/b".to_string(),
            to: "c/d/b".to_string(),
        }
        .build();
        hook.run(dir.path()).unwrap();
        assert!(dir.path().join("c/d/b").is_dir());
    }

    #[test]
    fn test_validate_rejects_escaping_paths() {
        let spec = HookSpec::Relocate {
            from: "../outside".to_string(),
            to: "inside".to_string(),
        };
        assert!(spec.validate().is_err());

        let spec = HookSpec::SharedLink {
            link: "/etc/passwd".to_string(),
            target: "x".to_string(),
        };
        assert!(spec.validate().is_err());
    }
}
