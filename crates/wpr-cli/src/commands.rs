use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::{debug, info_span};

use wpr_deploy::{
    DeployConfig, DeployReport, DeployRequest, Deployer, ReleaseEntry, RollbackReport,
};

use crate::cli::{DeployArgs, ListArgs, RollbackArgs, SiteArgs};

pub fn run_deploy(site: &SiteArgs, args: &DeployArgs) -> Result<DeployReport> {
    let (root, config) = resolve(site, args.releases_dir.as_deref())?;
    let span = info_span!("wp_release", root = %root.display());
    let _guard = span.enter();

    let mut request = DeployRequest::new(&root, &args.archive)
        .with_expected_sha256(args.sha256.clone())
        .with_dry_run(args.dry_run);
    if let Some(date) = &args.date {
        request = request.with_date(parse_date(date)?);
    }

    let deployer = Deployer::new(config).context("invalid configuration")?;
    let report = deployer
        .deploy(&request)
        .with_context(|| format!("deploy {} failed", args.archive.display()))?;
    Ok(report)
}

pub fn run_list(site: &SiteArgs, args: &ListArgs) -> Result<Vec<ReleaseEntry>> {
    let (root, config) = resolve(site, args.releases_dir.as_deref())?;
    let deployer = Deployer::new(config).context("invalid configuration")?;
    deployer
        .list(&root)
        .with_context(|| format!("list releases under {}", root.display()))
}

pub fn run_rollback(site: &SiteArgs, args: &RollbackArgs) -> Result<RollbackReport> {
    let (root, config) = resolve(site, args.releases_dir.as_deref())?;
    let deployer = Deployer::new(config).context("invalid configuration")?;
    deployer
        .rollback(&root, args.to.as_deref())
        .context("rollback failed")
}

/// Effective root and configuration: CLI flags over config file over defaults.
///
/// A `RELEASES_DIR` with several components moves the root to its parent,
/// so the current-release link and shared config sit next to it.
fn resolve(site: &SiteArgs, releases_dir: Option<&Path>) -> Result<(PathBuf, DeployConfig)> {
    let mut root = site.root.clone();
    let mut config = match &site.config {
        Some(path) => DeployConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => DeployConfig::discover(&root)
            .with_context(|| format!("load config from {}", root.display()))?,
    };

    if let Some(dir) = releases_dir {
        let (parent, name) = split_releases_dir(dir)?;
        if let Some(parent) = parent {
            root = root.join(parent);
        }
        config.releases_dir = name;
    }
    if let Some(keep) = site.keep {
        config.keep = keep;
    }
    debug!(
        "Using root {} with releases dir {} (keep {})",
        root.display(),
        config.releases_dir,
        config.keep
    );
    Ok((root, config))
}

fn split_releases_dir(dir: &Path) -> Result<(Option<PathBuf>, String)> {
    let Some(Component::Normal(name)) = dir.components().next_back() else {
        bail!("releases directory must end in a directory name: {}", dir.display());
    };
    let name = name.to_string_lossy().into_owned();
    let parent = dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf);
    Ok((parent, name))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid --date '{value}', expected YYYY-MM-DD"))
}
