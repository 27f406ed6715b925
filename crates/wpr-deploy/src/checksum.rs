//! SHA256 checksums of release archives.
//!
//! The digest of every deployed archive is recorded in the deploy report and
//! can be checked against an expected value before anything is written.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{DeployError, Result};

/// Buffer size for reading files during checksum computation.
const BUFFER_SIZE: usize = 65536; // 64 KB

/// Compute the SHA256 hash of a file.
pub fn compute_file_sha256(path: &Path) -> Result<String> {
    debug!("Computing SHA256 for: {}", path.display());

    let file = File::open(path).map_err(|e| DeployError::io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| DeployError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hex_hash = hex::encode(hasher.finalize());
    debug!("SHA256: {}", hex_hash);
    Ok(hex_hash)
}

/// Verify that a file matches the expected SHA256 hash.
///
/// Returns the computed digest on success.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<String> {
    info!("Verifying SHA256 checksum for: {}", path.display());

    let actual = compute_file_sha256(path)?;
    let expected = expected.trim().to_lowercase();

    if actual != expected {
        return Err(DeployError::ChecksumMismatch { expected, actual });
    }

    info!("Checksum verification successful");
    Ok(actual)
}
