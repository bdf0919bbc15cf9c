// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use steward::{AppUpdater, Application, Config, DirData, UpgradeOutcome, Upgrader};
use tracing::info;

#[derive(Parser)]
#[command(name = "steward")]
#[command(author, version, about = "Unattended update agent for deployed applications", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/steward/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update applications from a directory of artifact files
    Update {
        /// Application to update (default: all configured applications)
        app: Option<String>,

        /// Directory holding artifact files named after asset keys
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Log every operation without performing any of them
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace this binary with the latest published release
    Upgrade {
        /// Install the published build even when it is not newer
        #[arg(long)]
        force: bool,
    },
    /// Load and validate the configuration file
    CheckConfig,
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Steward v{}", env!("CARGO_PKG_VERSION"));
        println!("Run 'steward --help' for usage information");
        return Ok(());
    };

    let config = Config::load(Path::new(&cli.config))?;

    match command {
        Commands::Update {
            app,
            artifacts,
            dry_run,
        } => {
            let selected: Vec<&Application> = match &app {
                Some(name) => vec![config.find_application(name).ok_or_else(|| {
                    anyhow::anyhow!("no application named {} in {}", name, cli.config)
                })?],
                None => config.applications.iter().collect(),
            };
            if selected.is_empty() {
                println!("no applications configured");
                return Ok(());
            }

            let mut failed = Vec::new();
            for app in selected {
                info!("updating application: {}", app.name);

                let mut updater = AppUpdater::new(&config, app);
                if let Some(dir) = &artifacts {
                    updater = updater.with_data(DirData::new(dir.clone()));
                }
                let errs = updater.with_dry_run(dry_run).run();
                errs.log();

                if errs.level_is_error() {
                    failed.push(app.name.clone());
                } else if errs.is_empty() {
                    println!("updated {}", app.name);
                } else {
                    println!("updated {} (with warnings)", app.name);
                }
            }

            if !failed.is_empty() {
                anyhow::bail!("update failed for: {}", failed.join(", "));
            }
            Ok(())
        }
        Commands::Upgrade { force } => {
            match Upgrader::new(&config)?.run(force)? {
                UpgradeOutcome::UpToDate => println!("already up to date"),
                UpgradeOutcome::Upgraded(version) => println!("upgraded to {}", version),
            }
            Ok(())
        }
        Commands::CheckConfig => {
            println!("configuration ok: {}", cli.config);
            println!("  applications: {}", config.applications.len());
            for app in &config.applications {
                println!(
                    "  {} ({} assets, {} order entries)",
                    app.name,
                    app.assets.len(),
                    app.order.len()
                );
            }
            Ok(())
        }
    }
}
