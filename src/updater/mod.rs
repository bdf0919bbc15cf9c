// src/updater/mod.rs

//! Application update orchestration.
//!
//! [`AppUpdater`] drives one update run: cron validation up front, the
//! app-level service window, the pre-action, the asset schedule
//! (independent entries concurrently, then the sequential tail in
//! declared order), the post-action and finally the severity-gated cron
//! commit. The outcome is a [`JoinErrors`] aggregate; callers decide how
//! hard to take it via [`JoinErrors::level_is_error`].

mod asset;
mod command;
mod io;

pub use io::{DryRunSurface, HostSurface, Surface};

use crate::config::{Application, Config, OrderEntry};
use crate::cron::{self, CronJob};
use crate::error::{Error, Fault, JoinErrors, Result};
use crate::service::ServiceType;
use crate::source::{DataSource, NoData, JOBS_KEY};
use std::io::Read;
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::info;

/// Calls `clean` exactly once when the run ends, whichever way it ends
struct CleanGuard<'a>(&'a dyn DataSource);

impl Drop for CleanGuard<'_> {
    fn drop(&mut self) {
        self.0.clean();
    }
}

/// One update run over a single application
pub struct AppUpdater<'a> {
    config: &'a Config,
    app: &'a Application,
    data: Box<dyn DataSource>,
    surface: Box<dyn Surface>,
    dry_run: bool,
}

impl<'a> AppUpdater<'a> {
    pub fn new(config: &'a Config, app: &'a Application) -> Self {
        Self {
            config,
            app,
            data: Box::new(NoData),
            surface: Box::new(HostSurface),
            dry_run: false,
        }
    }

    /// Resolve asset bytes through `data` instead of the default empty
    /// source
    pub fn with_data(mut self, data: impl DataSource + 'static) -> Self {
        self.data = Box::new(data);
        self
    }

    /// Replace the side-effect surface, mainly for simulations and tests
    pub fn with_surface(mut self, surface: impl Surface + 'static) -> Self {
        self.surface = Box::new(surface);
        self
    }

    /// Log every operation without performing any of them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            self.surface = Box::new(DryRunSurface);
            self.dry_run = true;
        }
        self
    }

    /// Run the whole update. The returned aggregate holds every outcome
    /// that was not a clean success; an empty aggregate means nothing
    /// went wrong.
    pub fn run(&self) -> JoinErrors {
        let _clean = CleanGuard(self.data.as_ref());
        let mut errs = JoinErrors::new();

        info!("updating application {}", self.app.name);

        // a bad cron document aborts the run before anything is touched
        let jobs = match self.load_jobs() {
            Ok(jobs) => jobs,
            Err(err) => {
                errs.push(Fault::error(err.to_string()));
                return errs;
            }
        };

        let app_service = self.app.service.trim();
        let kind = ServiceType::from_name(&self.app.service_type);
        if !app_service.is_empty() {
            info!("stopping application service {}", app_service);
            if let Err(err) = self.surface.service_stop(app_service, kind) {
                errs.push(Fault::warning(format!(
                    "could not stop service {}: {}",
                    app_service, err
                )));
            }
        }

        if let Some(spec) = &self.app.pre_action {
            if let Err(err) = self.surface.run_command(spec) {
                errs.push(Fault::error(format!("pre-action failed: {}", err)));
            }
        }

        errs.concat(self.update_assets());

        if let Some(spec) = &self.app.post_action {
            if let Err(err) = self.surface.run_command(spec) {
                errs.push(Fault::error(format!("post-action failed: {}", err)));
            }
        }

        // the restart happens no matter how the assets went
        if !app_service.is_empty() {
            info!("starting application service {}", app_service);
            if let Err(err) = self.surface.service_start(app_service, kind) {
                errs.push(Fault::error(format!(
                    "could not start service {}: {}",
                    app_service, err
                )));
            }
        }

        if let Some(jobs) = jobs {
            if errs.level_is_error() {
                info!(
                    "skipping cron commit for {}: run has hard errors",
                    self.app.name
                );
            } else if self.dry_run {
                info!(
                    "dry-run: would write cron configuration for {}",
                    self.app.name
                );
            } else if let Err(err) =
                cron::write_cron_file(&self.config.cron_dir, &self.app.name, &jobs)
            {
                errs.push(Fault::error(err.to_string()));
            }
        }

        errs
    }

    /// Fetch and validate the cron document under the reserved key.
    /// `None` means the source supplies no cron configuration at all.
    fn load_jobs(&self) -> Result<Option<Vec<CronJob>>> {
        let Some(mut reader) = self.data.get(JOBS_KEY) else {
            return Ok(None);
        };
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| Error::CronError(format!("read cron jobs: {}", e)))?;
        Ok(Some(cron::validate(&content)?))
    }

    /// Work through the asset order: the leading run of independent
    /// entries fans out on threads and is joined before the remaining
    /// entries run sequentially in declared order.
    fn update_assets(&self) -> JoinErrors {
        let split = self
            .app
            .order
            .iter()
            .position(|entry| !entry.independent)
            .unwrap_or(self.app.order.len());
        let (concurrent, sequential) = self.app.order.split_at(split);

        let errs = Mutex::new(JoinErrors::new());
        if !concurrent.is_empty() {
            thread::scope(|scope| {
                for entry in concurrent {
                    let errs = &errs;
                    scope.spawn(move || {
                        let faults = self.run_entry(entry);
                        let mut errs = errs.lock().unwrap_or_else(PoisonError::into_inner);
                        for fault in faults {
                            errs.push(fault);
                        }
                    });
                }
            });
        }

        let mut errs = errs.into_inner().unwrap_or_else(PoisonError::into_inner);
        for entry in sequential {
            for fault in self.run_entry(entry) {
                errs.push(fault);
            }
        }
        errs
    }

    fn run_entry(&self, entry: &OrderEntry) -> Vec<Fault> {
        let Some(asset) = self.app.find_asset(&entry.asset) else {
            return vec![Fault::error(format!(
                "order references unknown asset {}",
                entry.asset
            ))];
        };
        asset::apply(self.surface.as_ref(), self.data.as_ref(), asset)
    }
}
