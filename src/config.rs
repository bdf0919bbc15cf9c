// src/config.rs

//! Agent configuration.
//!
//! A single [`Config`] value is loaded from a TOML file at startup and
//! passed by reference into the components that need it. There is no
//! process-wide configuration state.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

fn default_base_path() -> PathBuf {
    std::env::temp_dir().join("steward")
}

fn default_cron_dir() -> PathBuf {
    PathBuf::from("/etc/cron.d")
}

fn default_binary_name() -> String {
    "steward".to_string()
}

/// Top-level agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Scratch directory for staged downloads
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Cron drop-in directory written on successful runs
    #[serde(default = "default_cron_dir")]
    pub cron_dir: PathBuf,

    /// Self-upgrade settings
    #[serde(default)]
    pub upgrade: UpgradeSection,

    /// Managed applications
    #[serde(default, rename = "application")]
    pub applications: Vec<Application>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            cron_dir: default_cron_dir(),
            upgrade: UpgradeSection::default(),
            applications: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that TOML parsing cannot express
    pub fn validate(&self) -> Result<()> {
        for app in &self.applications {
            if app.name.is_empty() {
                return Err(Error::ConfigError("application with empty name".to_string()));
            }
            for asset in &app.assets {
                if asset.name.is_empty() {
                    return Err(Error::ConfigError(format!(
                        "application {}: asset with empty name",
                        app.name
                    )));
                }
                if asset.target_path.as_os_str().is_empty() {
                    return Err(Error::ConfigError(format!(
                        "application {}: asset {} has no target_path",
                        app.name, asset.name
                    )));
                }
            }
            for entry in &app.order {
                if app.find_asset(&entry.asset).is_none() {
                    return Err(Error::ConfigError(format!(
                        "application {}: order references unknown asset {}",
                        app.name, entry.asset
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn find_application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }
}

/// Self-upgrade settings
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeSection {
    /// Endpoint returning the latest release metadata as JSON
    #[serde(default)]
    pub release_url: String,

    /// Logical binary name matched against release asset filenames
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
}

impl Default for UpgradeSection {
    fn default() -> Self {
        Self {
            release_url: String::new(),
            binary_name: default_binary_name(),
        }
    }
}

/// One deployed application managed by the agent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Application {
    pub name: String,

    /// Service bound to the application as a whole (empty = none)
    #[serde(default)]
    pub service: String,

    /// Backend the service is managed by; unknown values fall back to
    /// the OS task scheduler
    #[serde(default)]
    pub service_type: String,

    /// Command run before any asset is touched
    #[serde(default)]
    pub pre_action: Option<Command>,

    /// Command run after all assets finished
    #[serde(default)]
    pub post_action: Option<Command>,

    #[serde(default, rename = "asset")]
    pub assets: Vec<Asset>,

    /// Scheduling order; entries reference assets by name
    #[serde(default, rename = "order")]
    pub order: Vec<OrderEntry>,
}

impl Application {
    pub fn find_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// One filesystem artifact of an application
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Asset {
    /// Logical key looked up in the data source
    pub name: String,

    /// Path the asset content lands at
    #[serde(default)]
    pub target_path: PathBuf,

    /// Service bound to this asset alone (empty = none)
    #[serde(default)]
    pub service: String,

    #[serde(default)]
    pub service_type: String,

    /// Decompress the copied file in place after the swap
    #[serde(default)]
    pub unzip: bool,

    /// Keep the displaced `.old` file after a successful swap
    #[serde(default)]
    pub keep_old: bool,

    #[serde(default)]
    pub pre_command: Option<Command>,

    #[serde(default)]
    pub post_command: Option<Command>,
}

/// Entry in an application's scheduling order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderEntry {
    /// Name of a declared asset
    pub asset: String,

    /// Eligible for the concurrent phase ahead of sequential entries
    #[serde(default)]
    pub independent: bool,
}

/// An external command hook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Command {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory (empty = inherit)
    #[serde(default)]
    pub working_dir: String,

    /// Deadline in seconds; absent means wait forever
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
