// src/error.rs

//! Error types and the severity model for update outcomes.
//!
//! Hard failures inside a single operation use the crate-wide [`Error`]
//! enum. Update runs aggregate per-step outcomes as [`Fault`] values
//! (message plus [`Severity`]) inside a [`JoinErrors`] container, which
//! decides whether the run as a whole counts as failed.

use std::fmt;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(String),

    #[error("download failed: {0}")]
    DownloadError(String),

    #[error("command failed: {0}")]
    CommandError(String),

    #[error("service control failed: {0}")]
    ServiceError(String),

    #[error("archive error: {0}")]
    ArchiveError(String),

    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("cron validation failed: {0}")]
    CronError(String),

    #[error("invalid version: {0}")]
    VersionError(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("no compatible release asset for {os}/{arch}")]
    NoAssetMatch { os: String, arch: String },

    #[error("no checksum entry for asset {0}")]
    MissingChecksum(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

/// How bad a single update outcome is.
///
/// `Warning` covers skipped or non-critical steps (missing asset data, a
/// failed service stop before a swap). `Error` covers anything that risks
/// corruption or leaves the system degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One severity-tagged outcome from an update step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    severity: Severity,
    message: String,
}

impl Fault {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Fault {}

/// Ordered collection of severity-tagged outcomes from one update run.
///
/// An empty container means the run was clean. A non-empty container with
/// only warnings is a soft failure: the run succeeded with caveats and
/// side effects gated on severity (the cron commit) still go ahead.
#[derive(Debug, Clone, Default)]
pub struct JoinErrors {
    faults: Vec<Fault>,
}

impl JoinErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Append every fault of `other`, preserving order.
    pub fn concat(&mut self, other: JoinErrors) {
        self.faults.extend(other.faults);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// True iff at least one contained fault has `Error` severity.
    pub fn level_is_error(&self) -> bool {
        self.faults
            .iter()
            .any(|f| f.severity() == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter()
    }

    /// Faults in display order: warnings first, then errors, each group
    /// keeping its insertion order.
    pub fn sorted_by_severity(&self) -> Vec<&Fault> {
        let mut sorted: Vec<&Fault> = self.faults.iter().collect();
        sorted.sort_by_key(|f| f.severity());
        sorted
    }

    /// Emit every fault at its own log level, in display order.
    pub fn log(&self) {
        for fault in self.sorted_by_severity() {
            match fault.severity() {
                Severity::Warning => tracing::warn!("{}", fault.message()),
                Severity::Error => tracing::error!("{}", fault.message()),
            }
        }
    }
}

impl fmt::Display for JoinErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for fault in &self.faults {
            if !first {
                write!(f, "\t")?;
            }
            write!(f, "{}", fault.message())?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for JoinErrors {}
