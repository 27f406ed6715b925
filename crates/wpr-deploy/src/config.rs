//! Deployment configuration.
//!
//! Every field has a default matching the stock WordPress layout, so a
//! missing config file is equivalent to an empty one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::hooks::HookSpec;

/// Name of the config file picked up from the deploy root when present.
pub const CONFIG_FILE_NAME: &str = "wp-release.toml";

/// Default number of releases (and archives) kept by retention cleanup.
pub const DEFAULT_KEEP: usize = 5;

/// Default short identifier used when no timestamp probe succeeds.
pub const DEFAULT_FALLBACK_ID: &str = "00000000";

const OWNER_RWX: u32 = 0o700;

/// Deployment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Directory (relative to the root) holding releases and archives.
    pub releases_dir: String,

    /// Symlink (relative to the root) pointing at the active release.
    pub current_link: String,

    /// How many release directories and archives survive cleanup.
    pub keep: usize,

    /// Mode applied to every directory in a release.
    pub dir_mode: u32,

    /// Mode applied to every regular file in a release.
    pub file_mode: u32,

    /// Short identifier used when the archive timestamp cannot be read.
    pub fallback_id: String,

    /// Post-extraction hooks, run in order.
    pub hooks: Vec<HookSpec>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            releases_dir: "releases".to_string(),
            current_link: "current-release".to_string(),
            keep: DEFAULT_KEEP,
            dir_mode: 0o755,
            file_mode: 0o644,
            fallback_id: DEFAULT_FALLBACK_ID.to_string(),
            hooks: HookSpec::wordpress_defaults(),
        }
    }
}

impl DeployConfig {
    /// Load and validate settings from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `wp-release.toml` from `root` when present, defaults otherwise.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.keep == 0 {
            return Err(DeployError::Config(
                "keep must be at least 1 (the active release is always kept)".to_string(),
            ));
        }
        check_plain_name("releases_dir", &self.releases_dir)?;
        check_plain_name("current_link", &self.current_link)?;
        if self.fallback_id.is_empty() || self.fallback_id.contains(['/', '\\']) {
            return Err(DeployError::Config(format!(
                "fallback_id must be a non-empty name, got '{}'",
                self.fallback_id
            )));
        }
        if self.dir_mode > 0o7777 || self.file_mode > 0o7777 {
            return Err(DeployError::Config(format!(
                "modes must be at most 0o7777 (dir_mode={:o}, file_mode={:o})",
                self.dir_mode, self.file_mode
            )));
        }
        // Owner must be able to enter, list and prune release directories.
        if self.dir_mode & OWNER_RWX != OWNER_RWX {
            return Err(DeployError::Config(format!(
                "dir_mode must grant the owner rwx (0o700), got {:o}",
                self.dir_mode
            )));
        }
        for hook in &self.hooks {
            hook.validate()?;
        }
        Ok(())
    }

    /// Absolute path of the releases directory under `root`.
    #[must_use]
    pub fn releases_path(&self, root: &Path) -> PathBuf {
        root.join(&self.releases_dir)
    }

    /// Absolute path of the current-release symlink under `root`.
    #[must_use]
    pub fn current_link_path(&self, root: &Path) -> PathBuf {
        root.join(&self.current_link)
    }
}

fn check_plain_name(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || value.contains(['/', '\\']) {
        return Err(DeployError::Config(format!(
            "{field} must be a single directory entry name, got '{value}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_wordpress_layout() {
        let config = DeployConfig::default();
        assert_eq!(config.releases_dir, "releases");
        assert_eq!(config.current_link, "current-release");
        assert_eq!(config.keep, 5);
        assert_eq!(config.dir_mode, 0o755);
        assert_eq!(config.file_mode, 0o644);
        assert_eq!(config.hooks.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DeployConfig::from_toml("keep = 3\n").unwrap();
        assert_eq!(config.keep, 3);
        assert_eq!(config.releases_dir, "releases");
        assert_eq!(config.hooks, HookSpec::wordpress_defaults());
    }

    #[test]
    fn test_hooks_override_defaults() {
        let config = DeployConfig::from_toml(
            r#"
hooks = [{ kind = "shared_link", link = "wp-config.php", target = "../../wp-config.php" }]
"#,
        )
        .unwrap();
        assert_eq!(
            config.hooks,
            vec![HookSpec::SharedLink {
                link: "wp-config.php".to_string(),
                target: "../../wp-config.php".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejects_zero_keep() {
        let err = DeployConfig::from_toml("keep = 0\n").unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }

    #[test]
    fn test_rejects_nested_releases_dir() {
        let err = DeployConfig::from_toml("releases_dir = \"a/b\"\n").unwrap_err();
        assert!(err.to_string().contains("releases_dir"));
    }

    #[test]
    fn test_rejects_dir_mode_without_owner_access() {
        // 420 == 0o644
        let err = DeployConfig::from_toml("dir_mode = 420\n").unwrap_err();
        assert!(err.to_string().contains("dir_mode"));
        assert!(DeployConfig::from_toml("dir_mode = 320\n").is_err());

        let config = DeployConfig::from_toml("dir_mode = 448\n").unwrap();
        assert_eq!(config.dir_mode, 0o700);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(DeployConfig::from_toml("retain = 3\n").is_err());
    }

    #[test]
    fn test_discover_without_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::discover(dir.path()).unwrap();
        assert_eq!(config, DeployConfig::default());
    }
}
