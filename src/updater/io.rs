// src/updater/io.rs

//! Capability surface for update side effects.
//!
//! Every filesystem, process and service operation an update performs
//! goes through the [`Surface`] trait, so a whole run can be simulated by
//! swapping in [`DryRunSurface`]. Operations are attempted exactly once;
//! retrying is never done down here.

use crate::archive;
use crate::config::Command as CommandSpec;
use crate::error::Result;
use crate::service::{self, ServiceType};
use crate::updater::command;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;
use tracing::info;

/// Side-effect operations available to the update pipeline
pub trait Surface: Send + Sync {
    /// Run a hook command to completion
    fn run_command(&self, spec: &CommandSpec) -> Result<()>;

    /// Decompress an archive next to itself
    fn unzip(&self, path: &Path) -> Result<()>;

    fn service_start(&self, name: &str, kind: ServiceType) -> Result<()>;

    fn service_stop(&self, name: &str, kind: ServiceType) -> Result<()>;

    /// Write a stream to `dest`, replacing any previous content
    fn copy_from_reader(&self, reader: &mut dyn Read, dest: &Path) -> Result<()>;

    /// Rename `old` to `new`. When `old` does not exist yet an empty
    /// placeholder is created first, so a swap never fails just because
    /// the target is new.
    fn rename_safe(&self, old: &Path, new: &Path) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;
}

/// The real thing: touches the host filesystem, processes and services
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSurface;

impl Surface for HostSurface {
    fn run_command(&self, spec: &CommandSpec) -> Result<()> {
        command::run_command(spec)
    }

    fn unzip(&self, path: &Path) -> Result<()> {
        archive::decompress(path)
    }

    fn service_start(&self, name: &str, kind: ServiceType) -> Result<()> {
        service::start(name, kind)
    }

    fn service_stop(&self, name: &str, kind: ServiceType) -> Result<()> {
        service::stop(name, kind)
    }

    fn copy_from_reader(&self, reader: &mut dyn Read, dest: &Path) -> Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o771);
        }
        let mut file = options.open(dest)?;
        io::copy(reader, &mut file)?;
        Ok(())
    }

    fn rename_safe(&self, old: &Path, new: &Path) -> Result<()> {
        if !old.exists() {
            File::create(old)?;
        }
        fs::rename(old, new)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Simulation surface: logs every operation and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSurface;

impl Surface for DryRunSurface {
    fn run_command(&self, spec: &CommandSpec) -> Result<()> {
        info!("dry-run: would run command: {}", spec);
        Ok(())
    }

    fn unzip(&self, path: &Path) -> Result<()> {
        info!("dry-run: would decompress {}", path.display());
        Ok(())
    }

    fn service_start(&self, name: &str, _kind: ServiceType) -> Result<()> {
        info!("dry-run: would start service {}", name);
        Ok(())
    }

    fn service_stop(&self, name: &str, _kind: ServiceType) -> Result<()> {
        info!("dry-run: would stop service {}", name);
        Ok(())
    }

    fn copy_from_reader(&self, _reader: &mut dyn Read, dest: &Path) -> Result<()> {
        info!("dry-run: would write {}", dest.display());
        Ok(())
    }

    fn rename_safe(&self, old: &Path, new: &Path) -> Result<()> {
        info!(
            "dry-run: would rename {} to {}",
            old.display(),
            new.display()
        );
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        info!("dry-run: would remove {}", path.display());
        Ok(())
    }
}
