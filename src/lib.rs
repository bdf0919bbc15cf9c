// src/lib.rs

//! Steward
//!
//! Unattended update agent for deployed applications: swaps asset files
//! atomically with rollback, coordinates the services bound to them and
//! reports severity-tagged outcomes. A self-upgrade pipeline applies the
//! same replace-and-verify discipline to the agent's own binary.
//!
//! # Architecture
//!
//! - Capability surface: every side effect behind one trait, with a
//!   dry-run implementation for simulation
//! - Severity model: warnings and errors aggregate instead of aborting,
//!   and gate the cron commit at the end of a run
//! - Two-tier scheduling: independent assets update concurrently, the
//!   rest sequentially in declared order
//! - Checksum-gated self-upgrade with a platform-specific binary swap

pub mod archive;
pub mod config;
pub mod cron;
mod error;
pub mod hash;
pub mod service;
pub mod source;
pub mod updater;
pub mod upgrade;
pub mod version;

pub use config::{Application, Asset, Command, Config, OrderEntry, UpgradeSection};
pub use error::{Error, Fault, JoinErrors, Result, Severity};
pub use source::{DataSource, DirData, EmptyData, NoData, JOBS_KEY};
pub use updater::{AppUpdater, DryRunSurface, HostSurface, Surface};
pub use upgrade::{UpgradeOutcome, Upgrader};
pub use version::VersionData;
