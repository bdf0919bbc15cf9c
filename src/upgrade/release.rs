// src/upgrade/release.rs

//! Release host client.
//!
//! Talks to a latest-release metadata endpoint and downloads release
//! assets. Every request is attempted exactly once; failures surface to
//! the caller instead of being retried here.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Timeout for release-host requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("steward/", env!("CARGO_PKG_VERSION"));

/// Latest-release metadata as returned by the release host
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseData {
    pub tag_name: String,

    #[serde(default)]
    pub assets: Vec<AssetData>,
}

/// One downloadable artifact attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct AssetData {
    pub name: String,

    pub browser_download_url: String,

    #[serde(default)]
    pub size: u64,
}

/// HTTP client for the release host
pub struct ReleaseClient {
    client: Client,
}

impl ReleaseClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::DownloadError(format!("create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch the latest release's metadata
    pub fn latest(&self, url: &str) -> Result<ReleaseData> {
        info!("fetching release metadata from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("fetch {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        response
            .json()
            .map_err(|e| Error::DownloadError(format!("parse release metadata: {e}")))
    }

    /// Download a URL into memory, for small payloads like checksum
    /// manifests
    pub fn download_to_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("fetch {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| Error::DownloadError(format!("read response from {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    /// Download an asset to `dest_path`, staging through a `.tmp`
    /// sibling so a torn download never lands at the final path
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("downloading {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("create directory {}: {e}", parent.display()))
            })?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("fetch {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| Error::IoError(format!("create {}: {e}", temp_path.display())))?;
        io::copy(&mut response, &mut file)
            .map_err(|e| Error::IoError(format!("write downloaded data: {e}")))?;

        fs::rename(&temp_path, dest_path).map_err(|e| {
            Error::IoError(format!(
                "move {} to {}: {e}",
                temp_path.display(),
                dest_path.display()
            ))
        })?;
        Ok(())
    }
}
