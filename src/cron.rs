// src/cron.rs

//! Cron job validation and rendering.
//!
//! Applications may ship a cron description through the data source key
//! `__jobs`: a JSON document holding either a single job object or an
//! array of them. Validation runs before any asset is touched; the
//! rendered drop-in file is only written once a run finished without
//! hard errors.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// One scheduled job: a comment name, a command line and a 5-field cron
/// expression
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CronJob {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub time: String,
}

/// Parse and validate a cron-job document. Empty input means no jobs.
///
/// Every problem in the document is reported in one error, field errors
/// and bad expressions alike, so a misconfigured file surfaces all at
/// once instead of one complaint per run.
pub fn validate(content: &[u8]) -> Result<Vec<CronJob>> {
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let (jobs, mut problems) = parse_jobs(content)?;

    for job in &jobs {
        if !job.time.is_empty() && !is_valid_expr(&job.time) {
            problems.push(format!(
                "{}: {} is not a valid cronjob expr",
                job.name, job.time
            ));
        }
    }

    if problems.is_empty() {
        Ok(jobs)
    } else {
        Err(Error::CronError(problems.join("\n")))
    }
}

/// Decode the document as one object first, then as an array. Missing
/// fields deserialize to empty strings and are reported as problems
/// rather than parse failures.
fn parse_jobs(content: &[u8]) -> Result<(Vec<CronJob>, Vec<String>)> {
    if let Ok(single) = serde_json::from_slice::<CronJob>(content) {
        let mut problems = Vec::new();
        if single.name.is_empty() {
            problems.push("missing name field".to_string());
        }
        if single.command.is_empty() {
            problems.push("missing command field".to_string());
        }
        if single.time.is_empty() {
            problems.push("missing time field".to_string());
        }
        return Ok((vec![single], problems));
    }

    let jobs: Vec<CronJob> = serde_json::from_slice(content)
        .map_err(|e| Error::CronError(format!("parse cron jobs: {}", e)))?;

    let mut problems = Vec::new();
    for (i, job) in jobs.iter().enumerate() {
        if job.name.is_empty() {
            problems.push(format!("missing name field for index {}", i));
        }
        if job.command.is_empty() {
            problems.push(format!("missing command field for index {}", i));
        }
        if job.time.is_empty() {
            problems.push(format!("missing time field for index {}", i));
        }
    }
    Ok((jobs, problems))
}

/// Syntactic check of a 5-field cron expression
/// (minute, hour, day of month, month, day of week).
fn is_valid_expr(expr: &str) -> bool {
    const BOUNDS: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 7)];

    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != BOUNDS.len() {
        return false;
    }
    fields
        .iter()
        .zip(BOUNDS)
        .all(|(field, (min, max))| field.split(',').all(|part| is_valid_part(part, min, max)))
}

/// One comma-separated list element: `*`, a value or a range, each with
/// an optional `/step`
fn is_valid_part(part: &str, min: u32, max: u32) -> bool {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (part, None),
    };

    if let Some(step) = step {
        if !step.parse::<u32>().is_ok_and(|n| n >= 1) {
            return false;
        }
    }

    if base == "*" {
        return true;
    }
    match base.split_once('-') {
        Some((lo, hi)) => {
            let (Ok(lo), Ok(hi)) = (lo.parse::<u32>(), hi.parse::<u32>()) else {
                return false;
            };
            lo >= min && hi <= max && lo <= hi
        }
        None => base.parse::<u32>().is_ok_and(|v| v >= min && v <= max),
    }
}

/// Render jobs to cron drop-in text, in input order. Pure, so it can be
/// checked without touching the filesystem.
pub fn render(jobs: &[CronJob]) -> String {
    let mut out = String::new();
    for job in jobs {
        out.push_str(&format!("# {}\n", job.name));
        // TODO make the cron user configurable
        out.push_str(&format!("{} root {}\n", job.time, job.command));
    }
    out
}

/// Rewrite the application's drop-in file under `cron_dir` with the
/// given jobs
pub fn write_cron_file(cron_dir: &Path, app_name: &str, jobs: &[CronJob]) -> Result<()> {
    if app_name.is_empty() {
        return Err(Error::CronError(
            "cannot write cron file: application name is empty".to_string(),
        ));
    }

    let path = cron_dir.join(app_name);
    fs::write(&path, render(jobs))
        .map_err(|e| Error::CronError(format!("write {}: {}", path.display(), e)))?;
    info!("wrote cron configuration {}", path.display());
    Ok(())
}
