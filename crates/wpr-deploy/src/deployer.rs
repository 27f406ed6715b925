//! The deployment pipeline.
//!
//! validate → identify → extract → hooks → permissions → activate →
//! store archive → prune. The mutating stages run under the releases lock.
//! A failure stops the pipeline; a partially extracted release directory is
//! left in place for inspection.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, info_span};

use crate::checksum::{compute_file_sha256, verify_sha256};
use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::history::{ReleaseEntry, list_releases, rollback_target};
use crate::hooks::{HookSpec, ReleaseHook, run_hooks};
use crate::lock::DeployLock;
use crate::release::ReleaseName;
use crate::steps::activate::{activate, current_release_name, ensure_replaceable};
use crate::steps::archive::store_archive;
use crate::steps::extract::{ExtractSummary, create_release_dir, extract_tar_gz};
use crate::steps::identify::{ReleaseId, TimestampProbe, default_probes, identify};
use crate::steps::permissions::{PermissionSummary, normalize_permissions};
use crate::steps::prune::{PruneReport, prune};

/// Inputs of one deployment.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Directory holding the releases directory and the current link.
    pub root: PathBuf,
    /// Archive to deploy.
    pub archive: PathBuf,
    /// Date embedded in the release name.
    pub date: NaiveDate,
    /// Expected SHA256 of the archive, checked before anything is written.
    pub expected_sha256: Option<String>,
    /// Stop after naming the release.
    pub dry_run: bool,
}

impl DeployRequest {
    /// Request for `archive` under `root`, dated today (local time).
    pub fn new(root: impl Into<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive: archive.into(),
            date: chrono::Local::now().date_naive(),
            expected_sha256: None,
            dry_run: false,
        }
    }

    /// Override the release date.
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Require the archive to match this SHA256.
    #[must_use]
    pub fn with_expected_sha256(mut self, digest: Option<String>) -> Self {
        self.expected_sha256 = digest;
        self
    }

    /// Only plan the deployment.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of a deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Release name.
    pub release: ReleaseName,
    /// Release directory.
    pub release_dir: PathBuf,
    /// Current-release symlink.
    pub current_link: PathBuf,
    /// Where the archive was stored (None on dry run).
    pub stored_archive: Option<PathBuf>,
    /// How the identifier was derived.
    pub id: ReleaseId,
    /// SHA256 of the archive.
    pub archive_sha256: String,
    /// Extraction counts.
    pub extracted: ExtractSummary,
    /// Permission normalization counts.
    pub permissions: PermissionSummary,
    /// Hooks applied (or planned on dry run).
    pub hooks: Vec<String>,
    /// Retention cleanup results.
    pub pruned: PruneReport,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Outcome of a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    /// Release active before the rollback.
    pub from: Option<String>,
    /// Release active after the rollback.
    pub to: String,
}

/// Runs deployments, listings and rollbacks for one configuration.
pub struct Deployer {
    config: DeployConfig,
    hooks: Vec<Box<dyn ReleaseHook>>,
    probes: Vec<Box<dyn TimestampProbe>>,
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .field("probes", &self.probes.len())
            .finish()
    }
}

impl Deployer {
    /// Validate `config` and build its hooks with the default probe order.
    pub fn new(config: DeployConfig) -> Result<Self> {
        config.validate()?;
        let hooks = config.hooks.iter().map(HookSpec::build).collect();
        Ok(Self {
            config,
            hooks,
            probes: default_probes(),
        })
    }

    /// Replace the timestamp probes.
    #[must_use]
    pub fn with_probes(mut self, probes: Vec<Box<dyn TimestampProbe>>) -> Self {
        self.probes = probes;
        self
    }

    /// Append a hook after the configured ones.
    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn ReleaseHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Deploy `request.archive` as a new release and activate it.
    pub fn deploy(&self, request: &DeployRequest) -> Result<DeployReport> {
        let span = info_span!("deploy", archive = %request.archive.display());
        let _guard = span.enter();

        if !request.archive.is_file() {
            return Err(DeployError::ArchiveNotFound {
                path: request.archive.clone(),
            });
        }
        let archive_sha256 = match &request.expected_sha256 {
            Some(expected) => verify_sha256(&request.archive, expected)?,
            None => compute_file_sha256(&request.archive)?,
        };

        let id = identify(&request.archive, &self.probes, &self.config.fallback_id);
        let release = ReleaseName::new(request.date, id.value.clone());
        let releases_dir = self.config.releases_path(&request.root);
        let release_dir = releases_dir.join(release.to_string());
        let current_link = self.config.current_link_path(&request.root);
        info!("Release {} from {}", release, request.archive.display());
        ensure_replaceable(&current_link)?;

        let mut report = DeployReport {
            release: release.clone(),
            release_dir: release_dir.clone(),
            current_link: current_link.clone(),
            stored_archive: None,
            id,
            archive_sha256,
            extracted: ExtractSummary::default(),
            permissions: PermissionSummary::default(),
            hooks: Vec::new(),
            pruned: PruneReport::default(),
            dry_run: request.dry_run,
        };

        if request.dry_run {
            self.check_release_slot(&release_dir, &releases_dir, &release)?;
            report.hooks = self.hooks.iter().map(|hook| hook.describe()).collect();
            info!("Dry run: nothing written");
            return Ok(report);
        }

        fs::create_dir_all(&releases_dir).map_err(|e| DeployError::io(&releases_dir, e))?;
        let _lock = DeployLock::acquire(&releases_dir)?;
        self.check_release_slot(&release_dir, &releases_dir, &release)?;

        create_release_dir(&release_dir)?;
        report.extracted = extract_tar_gz(&request.archive, &release_dir)?;
        report.hooks = run_hooks(&self.hooks, &release_dir)?;
        report.permissions =
            normalize_permissions(&release_dir, self.config.dir_mode, self.config.file_mode)?;

        activate(&current_link, &self.link_target(&release))?;
        report.stored_archive = Some(store_archive(
            &request.archive,
            &releases_dir,
            &release.archive_file_name(),
        )?);
        report.pruned = prune(
            &releases_dir,
            self.config.keep,
            Some(release.to_string().as_str()),
        )?;

        info!(
            "Deployed {} ({} removed releases, {} removed archives)",
            release,
            report.pruned.removed_releases.len(),
            report.pruned.removed_archives.len()
        );
        Ok(report)
    }

    /// Release history under `root`, newest first.
    pub fn list(&self, root: &Path) -> Result<Vec<ReleaseEntry>> {
        list_releases(
            &self.config.releases_path(root),
            &self.config.current_link_path(root),
        )
    }

    /// Point the current link at an older release. Nothing is deleted.
    pub fn rollback(&self, root: &Path, to: Option<&str>) -> Result<RollbackReport> {
        let span = info_span!("rollback", root = %root.display());
        let _guard = span.enter();

        let releases_dir = self.config.releases_path(root);
        if !releases_dir.is_dir() {
            return Err(DeployError::ReleaseNotFound(format!(
                "no releases directory at {}",
                releases_dir.display()
            )));
        }
        let _lock = DeployLock::acquire(&releases_dir)?;

        let current_link = self.config.current_link_path(root);
        let history = self.list(root)?;
        let target = rollback_target(&history, to)?;
        let release = ReleaseName::parse(&target.name)
            .ok_or_else(|| DeployError::ReleaseNotFound(target.name.clone()))?;

        let from = current_release_name(&current_link)?;
        activate(&current_link, &self.link_target(&release))?;
        info!(
            "Rolled back {} -> {}",
            from.as_deref().unwrap_or("<none>"),
            target.name
        );
        Ok(RollbackReport {
            from,
            to: target.name.clone(),
        })
    }

    fn check_release_slot(
        &self,
        release_dir: &Path,
        releases_dir: &Path,
        release: &ReleaseName,
    ) -> Result<()> {
        if fs::symlink_metadata(release_dir).is_ok() {
            return Err(DeployError::ReleaseExists {
                path: release_dir.to_path_buf(),
            });
        }
        let stored = releases_dir.join(release.archive_file_name());
        if fs::symlink_metadata(&stored).is_ok() {
            return Err(DeployError::ArchiveExists { path: stored });
        }
        Ok(())
    }

    /// Link target relative to the root, where the current link lives.
    fn link_target(&self, release: &ReleaseName) -> PathBuf {
        Path::new(&self.config.releases_dir).join(release.to_string())
    }
}
