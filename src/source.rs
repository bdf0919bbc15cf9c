// src/source.rs

//! Sources of new artifact bytes.
//!
//! A data source maps an asset name to a byte stream for one update run.
//! The reserved key [`JOBS_KEY`] carries the optional cron-job JSON
//! document. `clean` runs exactly once at the end of a run, whether or
//! not the run succeeded.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Reserved key supplying the cron-job document
pub const JOBS_KEY: &str = "__jobs";

/// Maps asset names to byte streams for one update run
pub trait DataSource: Send + Sync {
    /// Resolve an asset name to its content. `None` means the source has
    /// nothing under that name.
    fn get(&self, name: &str) -> Option<Box<dyn Read>>;

    /// Release anything the source holds. Invoked exactly once at the
    /// end of an update run.
    fn clean(&self) {}
}

/// Source with no content at all; every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoData;

impl DataSource for NoData {
    fn get(&self, _name: &str) -> Option<Box<dyn Read>> {
        None
    }
}

/// Source that resolves every name to an empty stream
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyData;

impl DataSource for EmptyData {
    fn get(&self, _name: &str) -> Option<Box<dyn Read>> {
        Some(Box::new(io::empty()))
    }
}

/// Source backed by a directory of files named after their asset keys
#[derive(Debug, Clone)]
pub struct DirData {
    dir: PathBuf,
    cleanup: bool,
}

impl DirData {
    /// Serve files from `dir`, leaving the directory in place afterwards
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cleanup: false,
        }
    }

    /// Serve files from a scratch directory this source owns; `clean`
    /// removes the whole directory
    pub fn owned(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cleanup: true,
        }
    }
}

impl DataSource for DirData {
    fn get(&self, name: &str) -> Option<Box<dyn Read>> {
        // Asset names are logical keys, never paths
        if name.contains(['/', '\\']) || name.contains("..") {
            warn!("rejecting asset name with path separators: {}", name);
            return None;
        }

        let path = self.dir.join(name);
        match File::open(&path) {
            Ok(file) => Some(Box::new(file)),
            Err(e) => {
                debug!("no data for asset {} at {}: {}", name, path.display(), e);
                None
            }
        }
    }

    fn clean(&self) {
        if !self.cleanup {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!("failed to remove scratch dir {}: {}", self.dir.display(), e);
        }
    }
}
