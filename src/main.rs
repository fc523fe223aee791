//! mdu - Multithreaded Disk Usage
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use mdu::config::{CliArgs, MduConfig};
use mdu::report::{print_report, print_summary};
use mdu::walker::Controller;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// At least one root hit a soft error or could not be accessed
const EXIT_SOFT_ERROR: u8 = 1;

/// Invalid configuration, nothing was measured
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_SOFT_ERROR),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Returns whether every root was measured cleanly
fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = MduConfig::from_args(args).context("Invalid configuration")?;

    info!(
        workers = config.worker_count,
        roots = config.paths.len(),
        "Starting measurement"
    );

    let controller = Controller::new(&config).context("Failed to start worker pool")?;

    let summary = controller
        .run(&config.paths, |report| print_report(report, config.human_readable))
        .context("Measurement failed")?;

    controller.shutdown();

    if config.show_summary {
        print_summary(&summary, config.worker_count);
    }

    if summary.had_error() {
        info!(errors = summary.errors(), "Completed with errors");
    }

    Ok(!summary.had_error())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("mdu=debug,warn")
    } else {
        EnvFilter::new("mdu=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging")?;

    Ok(())
}
