// src/service.rs

//! OS service control.
//!
//! Thin shell-outs satisfying the narrow start/stop contract around asset
//! swaps. The backend is selected per service by a configuration string;
//! unknown values fall back to the OS task scheduler.

use crate::error::{Error, Result};
use std::process::Command;
use tracing::debug;

/// Service manager variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Systemd,
    Nssm,
    TaskScheduler,
}

impl ServiceType {
    /// Map a configuration string to a backend. Unknown values fall back
    /// to the task scheduler.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "systemd" => Self::Systemd,
            "nssm" => Self::Nssm,
            _ => Self::TaskScheduler,
        }
    }
}

/// Start a service by name
pub fn start(name: &str, kind: ServiceType) -> Result<()> {
    match kind {
        ServiceType::Systemd => run("systemctl", &["start", name]),
        ServiceType::Nssm => run("nssm", &["start", name]),
        ServiceType::TaskScheduler => run("schtasks", &["/Run", "/TN", name]),
    }
}

/// Stop a service by name
pub fn stop(name: &str, kind: ServiceType) -> Result<()> {
    match kind {
        ServiceType::Systemd => run("systemctl", &["stop", name]),
        ServiceType::Nssm => run("nssm", &["stop", name]),
        ServiceType::TaskScheduler => run("schtasks", &["/End", "/TN", name]),
    }
}

fn run(program: &str, args: &[&str]) -> Result<()> {
    debug!("running {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::ServiceError(format!("{} {}: {}", program, args.join(" "), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ServiceError(format!(
            "{} {} exited with {}: {}",
            program,
            args.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
