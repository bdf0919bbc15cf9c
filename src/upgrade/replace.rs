// src/upgrade/replace.rs

//! Atomic replacement of the running executable.
//!
//! The running binary is renamed to `<path>.old` before the verified
//! replacement moves into its place, so a failed second step still
//! leaves a usable binary on disk. Cross-filesystem moves fall back to
//! copy plus fsync.

use crate::error::Result;
use std::fs;
#[cfg(unix)]
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
#[cfg(windows)]
use tracing::warn;

fn old_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

/// Move a file, falling back to copy+fsync+delete when source and
/// destination sit on different filesystems.
#[cfg(unix)]
fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            debug!(
                "cross-filesystem move {} -> {}, using copy fallback",
                src.display(),
                dst.display()
            );
            fs::copy(src, dst)?;

            let file = File::open(dst)?;
            file.sync_all()?;
            drop(file);

            // fsync on directories is not supported everywhere
            if let Some(parent) = dst.parent()
                && let Ok(dir) = File::open(parent)
            {
                let _ = dir.sync_all();
            }

            fs::remove_file(src)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Windows cannot report EXDEV the POSIX way; any rename failure gets
/// the copy fallback, which also covers cross-volume moves.
#[cfg(windows)]
fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                "rename {} -> {} failed ({}), using copy fallback",
                src.display(),
                dst.display(),
                e
            );
            fs::copy(src, dst)?;
            fs::remove_file(src)?;
            Ok(())
        }
    }
}

/// Replace `exe` with the verified file at `src`. The displaced binary
/// ends up at `<exe>.old`.
pub fn swap_executable(src: &Path, exe: &Path) -> Result<()> {
    let displaced = old_path(exe);

    // a leftover .old from an earlier upgrade blocks the rename on
    // Windows; on POSIX the rename replaces it
    #[cfg(windows)]
    if displaced.exists() {
        if let Err(e) = fs::remove_file(&displaced) {
            warn!("could not remove {}: {}", displaced.display(), e);
        }
    }

    move_file(exe, &displaced)?;
    move_file(src, exe)?;
    Ok(())
}

/// Put the owner and group execute bits back onto `path`; a freshly
/// downloaded file usually arrives without them.
#[cfg(unix)]
pub fn restore_execute_permission(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)?;
    let mut perms = metadata.permissions();
    perms.set_mode(perms.mode() | 0o110);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Windows derives executability from the file extension
#[cfg(windows)]
pub fn restore_execute_permission(_path: &Path) -> Result<()> {
    Ok(())
}
