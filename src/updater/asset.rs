// src/updater/asset.rs

//! Single-asset update pipeline.
//!
//! An asset update swaps the target file aside, writes the new content,
//! optionally decompresses it and runs the configured hooks around the
//! whole thing. Failures after the swap roll the previous content back;
//! a failed post-command does not, since the new bytes are already live.

use crate::config::Asset;
use crate::error::Fault;
use crate::service::ServiceType;
use crate::source::DataSource;
use crate::updater::io::Surface;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Backup path for a target: the same file name with `.old` appended
fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

/// In-flight swap of a target file.
///
/// `begin` moves the current content out of the way. The caller must
/// then either `commit` (drop the backup) or `abort` (restore it); if
/// neither runs the backup simply stays on disk.
struct AssetSwap<'a> {
    surface: &'a dyn Surface,
    target: &'a Path,
    backup: PathBuf,
}

impl<'a> AssetSwap<'a> {
    fn begin(surface: &'a dyn Surface, target: &'a Path) -> crate::Result<Self> {
        let backup = backup_path(target);
        surface.rename_safe(target, &backup)?;
        Ok(Self {
            surface,
            target,
            backup,
        })
    }

    /// Drop whatever landed at the target and put the previous content
    /// back. Both steps are best-effort.
    fn abort(self) {
        if let Err(err) = self.surface.remove(self.target) {
            warn!(
                "rollback: could not remove {}: {}",
                self.target.display(),
                err
            );
        }
        if let Err(err) = self.surface.rename_safe(&self.backup, self.target) {
            warn!(
                "rollback: could not restore {}: {}",
                self.target.display(),
                err
            );
        }
    }

    /// Accept the new content, dropping the backup unless asked to keep it
    fn commit(self, keep_old: bool) {
        if keep_old {
            debug!("keeping {}", self.backup.display());
            return;
        }
        if let Err(err) = self.surface.remove(&self.backup) {
            warn!("could not remove {}: {}", self.backup.display(), err);
        }
    }
}

/// Run the update pipeline for one asset. Returns `None` on success.
pub(crate) fn update_asset(
    surface: &dyn Surface,
    data: &dyn DataSource,
    asset: &Asset,
) -> Option<Fault> {
    if let Some(spec) = &asset.pre_command {
        if let Err(err) = surface.run_command(spec) {
            return Some(Fault::error(format!(
                "asset {}: pre-command failed: {}",
                asset.name, err
            )));
        }
    }

    let Some(mut reader) = data.get(&asset.name) else {
        return Some(Fault::warning(format!("no match for asset `{}`", asset.name)));
    };

    info!(
        "updating asset {} at {}",
        asset.name,
        asset.target_path.display()
    );

    let swap = match AssetSwap::begin(surface, &asset.target_path) {
        Ok(swap) => swap,
        Err(err) => {
            return Some(Fault::error(format!(
                "asset {}: could not set aside {}: {}",
                asset.name,
                asset.target_path.display(),
                err
            )));
        }
    };

    if let Err(err) = surface.copy_from_reader(reader.as_mut(), &asset.target_path) {
        swap.abort();
        return Some(Fault::error(format!(
            "asset {}: writing {} failed: {}",
            asset.name,
            asset.target_path.display(),
            err
        )));
    }

    if asset.unzip {
        if let Err(err) = surface.unzip(&asset.target_path) {
            swap.abort();
            return Some(Fault::error(format!(
                "asset {}: decompressing {} failed: {}",
                asset.name,
                asset.target_path.display(),
                err
            )));
        }
    }

    if let Some(spec) = &asset.post_command {
        if let Err(err) = surface.run_command(spec) {
            // the new content is already live; the backup stays on disk
            // for inspection
            return Some(Fault::error(format!(
                "asset {}: post-command failed: {}",
                asset.name, err
            )));
        }
    }

    swap.commit(asset.keep_old);
    None
}

/// Update one asset inside its service window: stop the bound service
/// first, run the pipeline, then start the service again no matter how
/// the pipeline went. A failed stop only warns; a failed start is an
/// error because it leaves the host degraded.
pub(crate) fn apply(surface: &dyn Surface, data: &dyn DataSource, asset: &Asset) -> Vec<Fault> {
    let mut faults = Vec::new();
    let service = asset.service.trim();
    let kind = ServiceType::from_name(&asset.service_type);

    if !service.is_empty() {
        if let Err(err) = surface.service_stop(service, kind) {
            faults.push(Fault::warning(format!(
                "could not stop service {}: {}",
                service, err
            )));
        }
    }

    if let Some(fault) = update_asset(surface, data, asset) {
        faults.push(fault);
    }

    if !service.is_empty() {
        if let Err(err) = surface.service_start(service, kind) {
            faults.push(Fault::error(format!(
                "could not start service {}: {}",
                service, err
            )));
        }
    }

    faults
}
