use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

#[cfg(unix)]
pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub(crate) fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Rename `from` to `to`, copying when the two live on different devices.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                "Rename across devices, copying {} -> {}",
                from.display(),
                to.display()
            );
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Modification time without following symlinks.
pub(crate) fn modified_no_follow(path: &Path) -> io::Result<SystemTime> {
    fs::symlink_metadata(path)?.modified()
}
