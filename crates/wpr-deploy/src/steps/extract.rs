//! Archive extraction into a new release directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;
use tar::Archive;

use crate::error::{DeployError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Counts gathered while unpacking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractSummary {
    /// Number of archive entries unpacked.
    pub entries: usize,
    /// Total size of file entries in bytes.
    pub bytes: u64,
}

/// Create `release_dir`, failing if it already exists.
///
/// The parent directory must exist. Creation is a single non-recursive
/// `mkdir`, so two deployments racing for the same name cannot both win.
pub fn create_release_dir(release_dir: &Path) -> Result<()> {
    match fs::create_dir(release_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DeployError::ReleaseExists {
            path: release_dir.to_path_buf(),
        }),
        Err(e) => Err(DeployError::io(release_dir, e)),
    }
}

/// Unpack a tar.gz archive into an existing directory.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<ExtractSummary> {
    tracing::debug!(
        "Extracting {} into {}",
        archive_path.display(),
        dest.display()
    );

    let mut file = File::open(archive_path).map_err(|e| DeployError::io(archive_path, e))?;
    check_gzip_magic(&mut file, archive_path)?;

    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);
    // Retention orders releases by mtime, so entries get the deploy time.
    archive.set_preserve_mtime(false);

    let mut summary = ExtractSummary::default();
    for entry_result in archive
        .entries()
        .map_err(|e| DeployError::Extraction(format!("Failed to read tar entries: {e}")))?
    {
        let mut entry = entry_result
            .map_err(|e| DeployError::Extraction(format!("Failed to read tar entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| DeployError::Extraction(format!("Failed to read entry path: {e}")))?
            .into_owned();

        let size = entry.header().size().unwrap_or(0);
        let unpacked = if entry.header().entry_type().is_dir() {
            // Archive directory modes are not applied: a read-only directory
            // would block its own children. Permissions are normalized later.
            unpack_dir(dest, &path)?
        } else {
            entry.unpack_in(dest).map_err(|e| {
                DeployError::Extraction(format!("Failed to unpack {}: {e}", path.display()))
            })?
        };
        if !unpacked {
            return Err(DeployError::Extraction(format!(
                "Entry {} escapes the release directory",
                path.display()
            )));
        }

        summary.entries += 1;
        if entry.header().entry_type().is_file() {
            summary.bytes += size;
        }
    }

    tracing::info!(
        "Extracted {} entries ({} bytes)",
        summary.entries,
        summary.bytes
    );
    Ok(summary)
}

/// Create `path` below `dest` one component at a time.
///
/// Returns `false` for paths that leave `dest`. Existing symlinks along the
/// way are refused so a directory entry cannot be created through them.
fn unpack_dir(dest: &Path, path: &Path) -> Result<bool> {
    let Some(relative) = inner_path(path) else {
        return Ok(false);
    };
    let mut current = dest.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(DeployError::Extraction(format!(
                    "Failed to unpack {}: {} is not a directory",
                    path.display(),
                    current.display()
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir(&current).map_err(|e| DeployError::io(&current, e))?;
            }
            Err(e) => return Err(DeployError::io(&current, e)),
        }
    }
    Ok(true)
}

/// Entry path with leading roots and `.` removed; `None` if it climbs out.
fn inner_path(path: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(relative)
}

fn check_gzip_magic(file: &mut File, path: &Path) -> Result<()> {
    let mut magic = [0u8; 2];
    let read = file
        .read(&mut magic)
        .map_err(|e| DeployError::io(path, e))?;
    if read < magic.len() || magic != GZIP_MAGIC {
        return Err(DeployError::Extraction(format!(
            "{} is not a gzip-compressed archive",
            path.display()
        )));
    }
    file.seek(SeekFrom::Start(0))
        .map_err(|e| DeployError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn write_archive(path: &Path, files: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o600);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_create_release_dir_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let release = dir.path().join("release-20240101-abcd1234");
        create_release_dir(&release).unwrap();
        let err = create_release_dir(&release).unwrap_err();
        assert!(matches!(err, DeployError::ReleaseExists { .. }));
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("release.tar.gz");
        write_archive(
            &archive,
            &[
                ("index.php", b"<?php"),
                ("wp-content/themes/site/style.css", b"body{}"),
            ],
        );
        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();

        let summary = extract_tar_gz(&archive, &dest).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.bytes, 11);
        assert_eq!(
            fs::read_to_string(dest.join("wp-content/themes/site/style.css")).unwrap(),
            "body{}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_does_not_block_children() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("release.tar.gz");
        let encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, kind, mode, data) in [
            ("wp-content", tar::EntryType::Directory, 0o555, &b""[..]),
            ("wp-content/plugins", tar::EntryType::Directory, 0o555, &b""[..]),
            ("wp-content/plugins/acf.php", tar::EntryType::Regular, 0o444, &b"<?php"[..]),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(kind);
            header.set_size(data.len() as u64);
            header.set_mode(mode);
            builder.append_data(&mut header, name, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();

        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        let summary = extract_tar_gz(&archive, &dest).unwrap();
        assert_eq!(summary.entries, 3);
        assert!(dest.join("wp-content/plugins/acf.php").is_file());

        let mode = fs::metadata(dest.join("wp-content"))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o200, 0, "archive directory mode must not be applied");
    }

    #[test]
    fn test_inner_path() {
        assert_eq!(
            inner_path(Path::new("./wp-content/plugins")),
            Some(PathBuf::from("wp-content/plugins"))
        );
        assert_eq!(inner_path(Path::new("/etc")), Some(PathBuf::from("etc")));
        assert_eq!(inner_path(Path::new("wp-content/../../etc")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_entry_through_symlink_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let outside = dir.path().join("outside");
        fs::create_dir(&dest).unwrap();
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, dest.join("link")).unwrap();

        assert!(unpack_dir(&dest, Path::new("link/evil")).is_err());
        assert!(!outside.join("evil").exists());
    }

    #[test]
    fn test_extract_rejects_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("release.tar.gz");
        fs::write(&archive, b"not an archive").unwrap();
        let err = extract_tar_gz(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::Extraction(_)));
    }

    #[test]
    fn test_extract_truncated_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("release.tar.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        std::io::Write::write_all(&mut encoder, &[7u8; 100]).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        assert!(matches!(
            extract_tar_gz(&archive, &dest),
            Err(DeployError::Extraction(_))
        ));
    }
}
