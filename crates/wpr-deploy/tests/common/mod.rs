//! Shared fixtures for deployment integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;

use wpr_deploy::{DeployConfig, DeployReport, DeployRequest, Deployer};

pub const ACF_PLUGINS: &str = "wp-content/plugins/advanced-custom-fields-pro";
pub const ACF_MU_PLUGINS: &str = "wp-content/mu-plugins/advanced-custom-fields-pro";

pub fn deploy_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// A WordPress-shaped archive with deliberately odd permissions.
pub fn write_site_archive(path: &Path, mtime_secs: u64) {
    write_archive(
        path,
        &[
            Entry::Dir("wp-content", 0o700),
            Entry::Dir("wp-content/plugins", 0o750),
            Entry::Dir(ACF_PLUGINS, 0o700),
            Entry::File("wp-content/plugins/advanced-custom-fields-pro/acf.php", b"<?php // acf", 0o600),
            Entry::Dir("wp-content/mu-plugins", 0o755),
            Entry::File("wp-content/mu-plugins/loader.php", b"<?php", 0o640),
            Entry::File("index.php", b"<?php require 'wp-blog-header.php';", 0o777),
            Entry::File("wp-config-sample.php", b"<?php", 0o600),
        ],
        mtime_secs,
    );
}

/// Archive without the ACF plugin, so the relocate hook fails.
pub fn write_archive_without_plugin(path: &Path, mtime_secs: u64) {
    write_archive(
        path,
        &[
            Entry::Dir("wp-content", 0o755),
            Entry::Dir("wp-content/mu-plugins", 0o755),
            Entry::File("index.php", b"<?php", 0o644),
        ],
        mtime_secs,
    );
}

pub enum Entry<'a> {
    Dir(&'a str, u32),
    File(&'a str, &'a [u8], u32),
}

pub fn write_archive(path: &Path, entries: &[Entry<'_>], mtime_secs: u64) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::Dir(name, mode) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(*mode);
                builder
                    .append_data(&mut header, name, io::empty())
                    .unwrap();
            }
            Entry::File(name, data, mode) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(data.len() as u64);
                header.set_mode(*mode);
                builder.append_data(&mut header, name, *data).unwrap();
            }
        }
    }
    builder.into_inner().unwrap().finish().unwrap();
    set_mtime(path, mtime_secs);
}

pub fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

pub fn deployer() -> Deployer {
    Deployer::new(DeployConfig::default()).unwrap()
}

pub fn request(root: &Path, archive: &Path) -> DeployRequest {
    DeployRequest::new(root, archive).with_date(deploy_date())
}

pub fn deploy_ok(root: &Path, archive: &Path) -> DeployReport {
    deployer().deploy(&request(root, archive)).unwrap()
}

pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn release_dirs(root: &Path) -> Vec<String> {
    entry_names(&root.join("releases"))
        .into_iter()
        .filter(|name| name.starts_with("release-") && !name.ends_with(".tar.gz"))
        .collect()
}

pub fn release_archives(root: &Path) -> Vec<String> {
    entry_names(&root.join("releases"))
        .into_iter()
        .filter(|name| name.starts_with("release-") && name.ends_with(".tar.gz"))
        .collect()
}

pub fn archive_path(root: &Path) -> PathBuf {
    root.join("release.tar.gz")
}
