//! Release-directory deployments for WordPress builds.
//!
//! This crate takes a pre-built `.tar.gz` of a WordPress site and turns it
//! into a new entry of a capistrano-style release history:
//!
//! ```text
//! <root>/
//!   current-release -> releases/release-20240131-1a2b3c4d
//!   config/                                  (shared, outside releases)
//!   releases/
//!     .wp-release.lock
//!     release-20240130-9f8e7d6c/
//!     release-20240130-9f8e7d6c.tar.gz
//!     release-20240131-1a2b3c4d/
//!       config -> ../../config
//!       wp-content/mu-plugins/advanced-custom-fields-pro/
//!     release-20240131-1a2b3c4d.tar.gz
//! ```
//!
//! # Pipeline
//!
//! [`Deployer::deploy`] runs these steps in order and stops at the first
//! error:
//!
//! 1. Check the archive exists (and optionally its SHA256).
//! 2. Derive the release identifier from the archive timestamp
//!    ([`steps::identify`]) and check the current-release link can be
//!    replaced.
//! 3. Lock the releases directory ([`DeployLock`]).
//! 4. Create the release directory, refusing to reuse one, and unpack the
//!    archive ([`steps::extract`]).
//! 5. Run the post-extraction hooks ([`hooks`]).
//! 6. Normalize permissions ([`steps::permissions`]).
//! 7. Swap the current-release link ([`steps::activate`]).
//! 8. Store the archive next to the release ([`steps::archive`]).
//! 9. Prune old releases and archives ([`steps::prune`]).
//!
//! # Example
//!
//! ```no_run
//! use wpr_deploy::{DeployConfig, DeployRequest, Deployer};
//!
//! fn deploy() -> wpr_deploy::Result<()> {
//!     let deployer = Deployer::new(DeployConfig::default())?;
//!     let report = deployer.deploy(&DeployRequest::new("/srv/site", "release.tar.gz"))?;
//!     println!("activated {}", report.release);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod checksum;
pub mod config;
pub mod error;
pub mod history;
pub mod hooks;
pub mod lock;
pub mod release;

// Individual steps
pub mod steps;

mod deployer;
mod fs_util;

pub use config::{CONFIG_FILE_NAME, DeployConfig};
pub use deployer::{DeployReport, DeployRequest, Deployer, RollbackReport};
pub use error::{DeployError, Result};
pub use history::ReleaseEntry;
pub use hooks::{HookSpec, ReleaseHook};
pub use lock::DeployLock;
pub use release::ReleaseName;
pub use steps::identify::{ReleaseId, TimestampProbe};
pub use steps::prune::PruneReport;

/// Current version of the tool.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
