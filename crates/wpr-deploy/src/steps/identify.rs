//! Release identifier derivation.
//!
//! The archive's modification time is read through an ordered list of
//! probes; the first success is hashed into an 8-character identifier.

use std::path::Path;
use std::process::Command;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

/// Length of the short identifier embedded in release names.
pub const SHORT_ID_LEN: usize = 8;

/// Source label recorded when no probe succeeded.
pub const FALLBACK_SOURCE: &str = "fallback";

/// Why a probe could not produce a timestamp.
#[derive(Debug, Error)]
#[error("{probe}: {message}")]
pub struct ProbeError {
    /// Probe that failed.
    pub probe: &'static str,
    /// Failure detail.
    pub message: String,
}

/// One way of reading an archive's modification time.
pub trait TimestampProbe {
    /// Name recorded as the identifier source.
    fn name(&self) -> &'static str;

    /// Seconds since the Unix epoch.
    fn probe(&self, path: &Path) -> Result<i64, ProbeError>;
}

/// Reads the timestamp from filesystem metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataProbe;

impl TimestampProbe for MetadataProbe {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn probe(&self, path: &Path) -> Result<i64, ProbeError> {
        let fail = |message: String| ProbeError {
            probe: self.name(),
            message,
        };
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| fail(e.to_string()))?;
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|e| fail(e.to_string()))?
            .as_secs();
        i64::try_from(secs).map_err(|e| fail(e.to_string()))
    }
}

/// Flavor of the external `stat` utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatProbe {
    /// GNU coreutils: `stat -c %Y`.
    Gnu,
    /// BSD / macOS: `stat -f %m`.
    Bsd,
}

impl StatProbe {
    fn format_args(self) -> [&'static str; 2] {
        match self {
            Self::Gnu => ["-c", "%Y"],
            Self::Bsd => ["-f", "%m"],
        }
    }
}

impl TimestampProbe for StatProbe {
    fn name(&self) -> &'static str {
        match self {
            Self::Gnu => "stat-gnu",
            Self::Bsd => "stat-bsd",
        }
    }

    fn probe(&self, path: &Path) -> Result<i64, ProbeError> {
        let fail = |message: String| ProbeError {
            probe: self.name(),
            message,
        };
        let output = Command::new("stat")
            .args(self.format_args())
            .arg(path)
            .output()
            .map_err(|e| fail(format!("failed to run stat: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(stderr.trim().to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<i64>()
            .map_err(|e| fail(format!("unexpected output '{}': {e}", stdout.trim())))
    }
}

/// The default probe order.
#[must_use]
pub fn default_probes() -> Vec<Box<dyn TimestampProbe>> {
    vec![
        Box::new(MetadataProbe),
        Box::new(StatProbe::Gnu),
        Box::new(StatProbe::Bsd),
    ]
}

/// Identifier chosen for a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseId {
    /// Short identifier used in the release name.
    pub value: String,
    /// Probe that produced the timestamp, or `fallback`.
    pub source: String,
    /// Timestamp the identifier was derived from.
    pub timestamp: Option<i64>,
}

impl ReleaseId {
    /// Whether the fallback token was used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}

/// Hash a timestamp into a short hex identifier.
#[must_use]
pub fn short_id_for_timestamp(timestamp: i64) -> String {
    let digest = Sha256::digest(timestamp.to_string().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(SHORT_ID_LEN);
    id
}

/// Run the probes in order and derive the release identifier.
///
/// Falls back to `fallback` with a warning when every probe fails.
pub fn identify(path: &Path, probes: &[Box<dyn TimestampProbe>], fallback: &str) -> ReleaseId {
    let mut failures = Vec::new();
    for probe in probes {
        match probe.probe(path) {
            Ok(timestamp) => {
                let value = short_id_for_timestamp(timestamp);
                debug!(
                    "Timestamp {} from {} -> id {}",
                    timestamp,
                    probe.name(),
                    value
                );
                return ReleaseId {
                    value,
                    source: probe.name().to_string(),
                    timestamp: Some(timestamp),
                };
            }
            Err(e) => {
                debug!("Timestamp probe failed: {}", e);
                failures.push(e.to_string());
            }
        }
    }

    warn!(
        "Could not read a timestamp for {} ({}); using fallback id '{}'",
        path.display(),
        failures.join("; "),
        fallback
    );
    ReleaseId {
        value: fallback.to_string(),
        source: FALLBACK_SOURCE.to_string(),
        timestamp: None,
    }
}
