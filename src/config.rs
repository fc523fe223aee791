//! Configuration types for mdu
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Thread-count clamping against hardware concurrency

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

/// Multithreaded disk usage
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mdu",
    version,
    about = "Measure disk usage of files and directory trees using a pool of worker threads",
    long_about = "Measures the total size of each PATH.\n\n\
                  Directories are traversed concurrently by a fixed pool of worker threads \
                  sharing one stack of pending subdirectories. Roots are measured one at a \
                  time, in argument order.",
    after_help = "EXAMPLES:\n    \
        mdu /var/log\n    \
        mdu -j 8 /usr /opt ~/Downloads\n    \
        mdu -j 4 -H --summary /data"
)]
pub struct CliArgs {
    /// Files or directories to measure
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Number of worker threads (clamped to hardware concurrency)
    #[arg(short = 'j', long = "jobs", default_value = "1", value_name = "NUM")]
    pub jobs: usize,

    /// How to account for subdirectories that cannot be read
    #[arg(long, value_enum, default_value_t = UnreadablePolicy::Skip, value_name = "POLICY")]
    pub unreadable: UnreadablePolicy,

    /// Print sizes with binary units (KiB, MiB, ...)
    #[arg(short = 'H', long)]
    pub human_readable: bool,

    /// Print a summary with totals and elapsed time
    #[arg(short = 's', long)]
    pub summary: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Accounting for a subdirectory the scan is not allowed to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnreadablePolicy {
    /// Contribute nothing
    #[default]
    Skip,
    /// Contribute the directory entry's own reported size
    CountEntry,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct MduConfig {
    /// Roots to measure, in argument order
    pub paths: Vec<PathBuf>,

    /// Number of worker threads
    pub worker_count: usize,

    /// Thread count originally requested, if it had to be clamped
    pub requested_workers: Option<usize>,

    /// Unreadable subdirectory policy
    pub unreadable: UnreadablePolicy,

    /// Print human-readable sizes
    pub human_readable: bool,

    /// Print end-of-run summary
    pub show_summary: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl MduConfig {
    /// Configuration with `worker_count` threads and no paths
    ///
    /// Used by library callers that drive the controller themselves. The
    /// count is not clamped here.
    pub fn new(worker_count: usize) -> Self {
        Self {
            paths: Vec::new(),
            worker_count,
            requested_workers: None,
            unreadable: UnreadablePolicy::default(),
            human_readable: false,
            show_summary: false,
            verbose: false,
        }
    }

    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unreadable(mut self, policy: UnreadablePolicy) -> Self {
        self.unreadable = policy;
        self
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        Self::from_args_with_limit(args, hardware_threads())
    }

    /// As [`MduConfig::from_args`], with an explicit hardware limit
    pub fn from_args_with_limit(args: CliArgs, max_threads: usize) -> Result<Self, ConfigError> {
        if args.paths.is_empty() {
            return Err(ConfigError::NoPaths);
        }

        let (worker_count, clamped) = clamp_workers(args.jobs, max_threads)?;
        let requested_workers = if clamped {
            warn!(
                requested = args.jobs,
                max = worker_count,
                "Number of threads exceeds hardware concurrency, clamping"
            );
            Some(args.jobs)
        } else {
            None
        };

        Ok(Self {
            paths: args.paths,
            worker_count,
            requested_workers,
            unreadable: args.unreadable,
            human_readable: args.human_readable,
            show_summary: args.summary,
            verbose: args.verbose,
        })
    }

    /// Validate the configuration before spawning any worker
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidThreadCount { count: 0 });
        }
        Ok(())
    }
}

/// Detected hardware concurrency (at least 1)
pub fn hardware_threads() -> usize {
    num_cpus::get().max(1)
}

/// Bound `requested` by `max_threads`
///
/// Returns the usable count and whether clamping happened. Zero is rejected.
pub fn clamp_workers(requested: usize, max_threads: usize) -> Result<(usize, bool), ConfigError> {
    if requested == 0 {
        return Err(ConfigError::InvalidThreadCount { count: requested });
    }
    let max_threads = max_threads.max(1);
    if requested > max_threads {
        Ok((max_threads, true))
    } else {
        Ok((requested, false))
    }
}
