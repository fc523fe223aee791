//! Controller - drives measurement of every root
//!
//! The controller is responsible for:
//! - Spawning the worker pool once, up front
//! - Classifying each root (missing, plain file, directory)
//! - Installing one job at a time and waiting for its completion signal
//! - Shutting the pool down and joining every worker

use crate::config::{MduConfig, UnreadablePolicy};
use crate::error::{ProbeError, Result, WorkerError};
use crate::probe::{FsProbe, SizeProbe};
use crate::report;
use crate::walker::state::{JobResult, SharedState};
use crate::walker::worker::{aggregate_stats, unreadable_stub, PoolStats, Worker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a single root was measured
#[derive(Debug)]
pub enum RootOutcome {
    /// Directory tree traversed by the worker pool
    Directory(JobResult),

    /// Non-directory root, sized directly
    File { size: u64 },

    /// Root could not be queried at all
    Inaccessible { error: ProbeError },
}

/// Result for one root argument
#[derive(Debug)]
pub struct RootReport {
    pub path: PathBuf,
    pub outcome: RootOutcome,
}

impl RootReport {
    /// Reported size, if the root could be measured
    pub fn size(&self) -> Option<u64> {
        match &self.outcome {
            RootOutcome::Directory(result) => Some(result.total),
            RootOutcome::File { size } => Some(*size),
            RootOutcome::Inaccessible { .. } => None,
        }
    }

    /// True if measuring this root hit any error
    pub fn is_error(&self) -> bool {
        match &self.outcome {
            RootOutcome::Directory(result) => result.had_error,
            RootOutcome::File { .. } => false,
            RootOutcome::Inaccessible { .. } => true,
        }
    }
}

/// Results for every root of one run
#[derive(Debug)]
pub struct RunSummary {
    pub reports: Vec<RootReport>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn had_error(&self) -> bool {
        self.reports.iter().any(RootReport::is_error)
    }

    pub fn total_bytes(&self) -> u64 {
        self.reports.iter().filter_map(RootReport::size).sum()
    }

    /// Directories listed across all roots
    pub fn dirs(&self) -> u64 {
        self.jobs().map(|job| job.dirs).sum()
    }

    /// Files sized across all roots (plain-file roots included)
    pub fn files(&self) -> u64 {
        let direct = self
            .reports
            .iter()
            .filter(|r| matches!(r.outcome, RootOutcome::File { .. }))
            .count() as u64;
        direct + self.jobs().map(|job| job.files).sum::<u64>()
    }

    /// Soft errors plus inaccessible roots
    pub fn errors(&self) -> u64 {
        let roots = self
            .reports
            .iter()
            .filter(|r| matches!(r.outcome, RootOutcome::Inaccessible { .. }))
            .count() as u64;
        roots + self.jobs().map(|job| job.soft_errors).sum::<u64>()
    }

    fn jobs(&self) -> impl Iterator<Item = &JobResult> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            RootOutcome::Directory(result) => Some(result),
            _ => None,
        })
    }
}

/// Owns the worker pool and measures roots one at a time
pub struct Controller {
    state: Arc<SharedState>,
    probe: Arc<dyn SizeProbe>,
    policy: UnreadablePolicy,
    workers: Vec<Worker>,
}

impl Controller {
    /// Create a controller over the local filesystem
    pub fn new(config: &MduConfig) -> Result<Self> {
        Self::with_probe(config, Arc::new(FsProbe::new()))
    }

    /// Create a controller over any [`SizeProbe`]
    pub fn with_probe(config: &MduConfig, probe: Arc<dyn SizeProbe>) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SharedState::new(config.worker_count));
        let mut controller = Self {
            state,
            probe,
            policy: config.unreadable,
            workers: Vec::with_capacity(config.worker_count),
        };
        controller.spawn_workers(config.worker_count)?;
        Ok(controller)
    }

    fn spawn_workers(&mut self, count: usize) -> Result<()> {
        for id in 0..count {
            let worker = Worker::spawn(
                id,
                Arc::clone(&self.state),
                Arc::clone(&self.probe),
                self.policy,
            )?;
            self.workers.push(worker);
        }

        debug!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Measure a single root
    ///
    /// Missing roots and plain files never reach the worker pool.
    pub fn measure(&self, root: &Path) -> Result<RootReport> {
        let info = match self.probe.stat_target(root) {
            Ok(info) => info,
            Err(error) => {
                report::print_inaccessible(root, &error);
                return Ok(RootReport {
                    path: root.to_path_buf(),
                    outcome: RootOutcome::Inaccessible { error },
                });
            }
        };

        if !info.kind.is_dir() {
            return Ok(RootReport {
                path: root.to_path_buf(),
                outcome: RootOutcome::File { size: info.size },
            });
        }

        if !info.readable {
            report::print_unreadable(root);
            let result = JobResult {
                root: root.to_path_buf(),
                total: unreadable_stub(root, self.probe.as_ref(), self.policy),
                had_error: true,
                dirs: 0,
                files: 0,
                soft_errors: 1,
            };
            return Ok(RootReport {
                path: root.to_path_buf(),
                outcome: RootOutcome::Directory(result),
            });
        }

        let start = Instant::now();
        self.state.install_job(root.to_path_buf())?;
        let result = self
            .state
            .await_completion()
            .ok_or_else(|| WorkerError::JobLost {
                root: root.to_path_buf(),
            })?;

        debug!(
            root = %root.display(),
            total = result.total,
            dirs = result.dirs,
            files = result.files,
            errors = result.soft_errors,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Job complete"
        );

        Ok(RootReport {
            path: root.to_path_buf(),
            outcome: RootOutcome::Directory(result),
        })
    }

    /// Measure `roots` in order, handing each report to `on_report` as soon
    /// as it is available
    pub fn run<I, P, F>(&self, roots: I, mut on_report: F) -> Result<RunSummary>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: FnMut(&RootReport),
    {
        let start = Instant::now();
        let mut reports = Vec::new();

        for root in roots {
            let report = self.measure(root.as_ref())?;
            on_report(&report);
            reports.push(report);
        }

        Ok(RunSummary {
            reports,
            duration: start.elapsed(),
        })
    }

    /// Stop every worker and wait for it to exit
    pub fn shutdown(mut self) -> PoolStats {
        self.join_workers()
    }

    fn join_workers(&mut self) -> PoolStats {
        self.state.request_shutdown();

        let stats = aggregate_stats(&self.workers);
        for worker in std::mem::take(&mut self.workers) {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
            }
        }

        info!(
            dirs = stats.dirs,
            files = stats.files,
            bytes = stats.bytes,
            errors = stats.errors,
            "Worker pool stopped"
        );
        stats
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.join_workers();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_measure_directory_and_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/one"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("a/b/two"), vec![0u8; 20]).unwrap();
        let file = dir.path().join("top");
        fs::write(&file, vec![0u8; 7]).unwrap();

        let controller = Controller::new(&MduConfig::new(2)).unwrap();
        assert_eq!(controller.worker_count(), 2);

        let report = controller.measure(dir.path()).unwrap();
        assert_eq!(report.size(), Some(37));
        assert!(!report.is_error());

        let report = controller.measure(&file).unwrap();
        assert!(matches!(report.outcome, RootOutcome::File { size: 7 }));

        let stats = controller.shutdown();
        assert_eq!(stats.bytes, 30);
        assert_eq!(stats.dirs, 3);
    }

    #[test]
    fn test_run_summary() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), vec![0u8; 5]).unwrap();
        let missing = dir.path().join("missing");

        let controller = Controller::new(&MduConfig::new(1)).unwrap();
        let mut seen = Vec::new();
        let summary = controller
            .run([dir.path().to_path_buf(), missing.clone()], |r| {
                seen.push(r.path.clone())
            })
            .unwrap();

        assert_eq!(seen, vec![dir.path().to_path_buf(), missing]);
        assert!(summary.had_error());
        assert_eq!(summary.total_bytes(), 5);
        assert_eq!(summary.files(), 1);
        assert_eq!(summary.errors(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Controller::new(&MduConfig::new(0)).is_err());
    }

    #[test]
    fn test_drop_joins_workers() {
        let controller = Controller::new(&MduConfig::new(3)).unwrap();
        let state = Arc::clone(&controller.state);
        drop(controller);
        assert!(state.is_shutting_down());
        assert_eq!(Arc::strong_count(&state), 1);
    }
}
