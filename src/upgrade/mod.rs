// src/upgrade/mod.rs

//! Self-upgrade of the agent binary.
//!
//! The pipeline fetches the latest release, compares its tag against
//! the running version, picks the build matching this OS and
//! architecture, verifies the download against the publisher's checksum
//! manifest and only then swaps the running executable. Any failure
//! before the swap leaves the current binary untouched.

mod release;
mod replace;

pub use release::{AssetData, ReleaseClient, ReleaseData};
pub use replace::{restore_execute_permission, swap_executable};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash;
use crate::version::VersionData;
use std::env::consts;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// What an upgrade attempt amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The running binary is already the latest published version
    UpToDate,

    /// The binary was replaced with the given version
    Upgraded(VersionData),
}

/// One self-upgrade attempt against the configured release host
pub struct Upgrader<'a> {
    config: &'a Config,
    client: ReleaseClient,
}

impl<'a> Upgrader<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        Ok(Self {
            config,
            client: ReleaseClient::new()?,
        })
    }

    /// Run the upgrade against the running executable. With `force` the
    /// version comparison is skipped and the published build is
    /// installed even when it is not newer; checksum verification is
    /// never skipped.
    pub fn run(&self, force: bool) -> Result<UpgradeOutcome> {
        let exe = current_executable()?;
        self.run_at(force, &exe)
    }

    /// Run the upgrade against the binary at `exe` instead of the
    /// running executable
    pub fn run_at(&self, force: bool, exe: &Path) -> Result<UpgradeOutcome> {
        let url = self.config.upgrade.release_url.trim();
        if url.is_empty() {
            return Err(Error::ConfigError(
                "upgrade.release_url is not set".to_string(),
            ));
        }

        let release = self.client.latest(url)?;
        let remote = VersionData::parse(&release.tag_name)?;
        let running = VersionData::current()?;

        if !force && !remote.is_later(&running) {
            info!("running version {} is up to date", running);
            return Ok(UpgradeOutcome::UpToDate);
        }

        let (artifact, manifest) = select_assets(
            &self.config.upgrade.binary_name,
            &release,
            consts::OS,
            consts::ARCH,
        )?;

        fs::create_dir_all(&self.config.base_path).map_err(|e| {
            Error::IoError(format!(
                "create {}: {}",
                self.config.base_path.display(),
                e
            ))
        })?;
        let staged = self.config.base_path.join(&artifact.name);
        self.client
            .download_file(&artifact.browser_download_url, &staged)?;

        let manifest_bytes = self.client.download_to_bytes(&manifest.browser_download_url)?;
        let manifest_text = String::from_utf8(manifest_bytes)
            .map_err(|_| Error::DownloadError("checksum manifest is not valid UTF-8".to_string()))?;
        let expected = checksum_for(&manifest_text, &artifact.name)?;

        hash::verify_file_sha256(&staged, &expected).map_err(|e| Error::ChecksumMismatch {
            expected: e.expected,
            actual: e.actual,
        })?;
        info!("checksum verified for {}", artifact.name);

        swap_executable(&staged, exe)?;

        // the new binary is already in place, a failed chmod only warns
        if let Err(err) = restore_execute_permission(exe) {
            warn!("could not restore execute permission on {}: {}", exe.display(), err);
        }

        info!("upgraded from {} to {}", running, remote);
        Ok(UpgradeOutcome::Upgraded(remote))
    }
}

/// Resolved path of the running executable, symlinks followed
fn current_executable() -> Result<std::path::PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| Error::IoError(format!("locate running executable: {}", e)))?;
    fs::canonicalize(&exe)
        .map_err(|e| Error::IoError(format!("resolve {}: {}", exe.display(), e)))
}

/// Pick the artifact built for this platform plus the checksum
/// manifest. Artifact names are underscore-delimited; token 0 carries
/// the binary name, token 2 the OS and token 3 the architecture.
fn select_assets<'r>(
    binary_name: &str,
    release: &'r ReleaseData,
    os: &str,
    arch: &str,
) -> Result<(&'r AssetData, &'r AssetData)> {
    let mut artifact = None;
    let mut manifest = None;

    for asset in &release.assets {
        if asset.name.ends_with("checksums.txt") {
            manifest = Some(asset);
            continue;
        }

        let tokens: Vec<&str> = asset.name.split('_').collect();
        if tokens.len() < 4 {
            continue;
        }
        if tokens[0].contains(binary_name) && tokens[2].contains(os) && tokens[3].contains(arch) {
            artifact = Some(asset);
        }
    }

    let artifact = artifact.ok_or_else(|| Error::NoAssetMatch {
        os: os.to_string(),
        arch: arch.to_string(),
    })?;
    let manifest = manifest.ok_or_else(|| Error::MissingChecksum(artifact.name.clone()))?;
    Ok((artifact, manifest))
}

/// Extract the hex digest for `asset_name` from a checksum manifest:
/// the leading token of the first line mentioning the asset.
fn checksum_for(manifest: &str, asset_name: &str) -> Result<String> {
    for line in manifest.lines() {
        if line.contains(asset_name) {
            return line
                .split_whitespace()
                .next()
                .map(|digest| digest.to_string())
                .ok_or_else(|| Error::MissingChecksum(asset_name.to_string()));
        }
    }
    Err(Error::MissingChecksum(asset_name.to_string()))
}
