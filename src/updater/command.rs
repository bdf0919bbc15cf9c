// src/updater/command.rs

//! Hook command execution with captured output.
//!
//! Pre/post hooks run with stdin closed and both pipes captured. Output
//! is streamed to the log line by line while the child runs, so a chatty
//! hook cannot fill the pipe buffer and stall the update. An optional
//! per-command deadline kills the child on expiry.

use crate::config::Command as CommandSpec;
use crate::error::{Error, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};
use wait_timeout::ChildExt;

/// Run a hook command to completion
pub fn run_command(spec: &CommandSpec) -> Result<()> {
    info!("running command: {}", spec);

    let mut command = Command::new(&spec.command);
    command.args(&spec.args);
    if !spec.working_dir.is_empty() {
        command.current_dir(&spec.working_dir);
    }

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::CommandError(format!("spawn {}: {}", spec, e)))?;

    let stdout = spawn_pipe_reader("stdout", child.stdout.take());
    let stderr = spawn_pipe_reader("stderr", child.stderr.take());

    let status = match spec.timeout_secs {
        Some(secs) => match child.wait_timeout(Duration::from_secs(secs))? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                join_reader(stdout);
                join_reader(stderr);
                return Err(Error::CommandError(format!(
                    "{} timed out after {}s",
                    spec, secs
                )));
            }
        },
        None => child.wait()?,
    };

    join_reader(stdout);
    join_reader(stderr);

    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandError(format!(
            "{} exited with {}",
            spec, status
        )))
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(
    pipe: &'static str,
    reader: Option<R>,
) -> Option<JoinHandle<()>> {
    let reader = reader?;
    Some(thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    if pipe == "stdout" {
                        info!(pipe, "{}", line);
                    } else {
                        warn!(pipe, "{}", line);
                    }
                }
                Err(_) => break,
            }
        }
    }))
}

fn join_reader(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        let _ = handle.join();
    }
}
