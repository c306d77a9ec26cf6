//! vcstatus CLI - live version-control status
//!
//! One-shot queries against the status cache, and a `watch` mode that keeps
//! it current and reprints pending files whenever they change.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use vcstatus::{StatusRepository, StatusScheduler};
use vcstatus_cli::output::{render_json, render_text, status_line};
use vcstatus_cli::{open_repository, Config};

#[derive(Parser)]
#[command(name = "vcstatus")]
#[command(about = "Live version-control status of working copies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the status code of each path
    Status {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print files with pending changes
    Pending {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the distinct branch names of the repositories
    Branches {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
    /// Keep watching and reprint pending files on every change
    Watch {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Status { paths } => print_status(&config, &paths),
        Commands::Pending { dirs, json } => print_pending(&config, &dirs, json),
        Commands::Branches { dirs } => print_branches(&config, &dirs),
        Commands::Watch { dirs } => watch(&config, &dirs).await,
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "vcstatus={level},vcstatus_core={level},vcstatus_git={level},\
             vcstatus_watcher={level},vcstatus_cli={level}"
        ))
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn print_status(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let repository = open_repository(config, paths)?;
    for path in paths {
        let absolute = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        println!("{}", status_line(path, repository.file_status(&absolute)));
    }
    Ok(())
}

fn print_pending(config: &Config, dirs: &[PathBuf], json: bool) -> Result<()> {
    let repository = open_repository(config, dirs)?;
    let pending = repository.pending_files();
    if json {
        println!("{}", render_json(&pending)?);
    } else if !pending.is_empty() {
        println!("{}", render_text(&pending));
    }
    Ok(())
}

fn print_branches(config: &Config, dirs: &[PathBuf]) -> Result<()> {
    let repository = open_repository(config, dirs)?;
    for branch in repository.branch_names() {
        println!("{branch}");
    }
    Ok(())
}

async fn watch(config: &Config, dirs: &[PathBuf]) -> Result<()> {
    let repository = open_repository(config, dirs)?;
    if !config.watcher.enabled {
        warn!("File watching is disabled; only queued commands will be reconciled");
    }

    print_snapshot(&repository);
    let mut changes = repository.subscribe();
    let scheduler =
        StatusScheduler::spawn(Arc::clone(&repository), config.status.tick_interval());
    info!("Watching {} repositories, press Ctrl-C to stop", repository.roots().len());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            change = changes.recv() => match change {
                Ok(_) | Err(RecvError::Lagged(_)) => print_snapshot(&repository),
                Err(RecvError::Closed) => break,
            },
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

fn print_snapshot(repository: &StatusRepository) {
    let pending = repository.pending_files();
    println!("--- {} pending", pending.len());
    if !pending.is_empty() {
        println!("{}", render_text(&pending));
    }
}
