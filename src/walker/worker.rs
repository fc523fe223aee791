//! Worker thread logic for parallel directory sizing
//!
//! Each worker:
//! - Pops a directory from the shared stack (blocking while idle)
//! - Lists and sizes its children without holding the lock
//! - Pushes readable subdirectories back onto the stack
//! - Merges its local byte count and soft errors into the job
//!
//! Workers run until the controller requests shutdown.

use crate::config::UnreadablePolicy;
use crate::error::{DirOutcome, WorkerError};
use crate::probe::{EntryKind, SizeProbe};
use crate::report;
use crate::walker::state::{Expansion, SharedState};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

/// Statistics collected by a worker across all jobs
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_processed: AtomicU64,

    /// Files and symlinks sized
    pub files_found: AtomicU64,

    /// Bytes found
    pub bytes_found: AtomicU64,

    /// Soft errors encountered
    pub errors: AtomicU64,
}

impl WorkerStats {
    fn record(&self, expansion: &Expansion) {
        if expansion.listed {
            self.dirs_processed.fetch_add(1, Ordering::Relaxed);
        }
        self.files_found.fetch_add(expansion.files, Ordering::Relaxed);
        self.bytes_found.fetch_add(expansion.bytes, Ordering::Relaxed);
        self.errors.fetch_add(expansion.soft_errors, Ordering::Relaxed);
    }
}

/// Totals over the whole pool
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub errors: u64,
}

/// A worker thread that drains jobs from [`SharedState`]
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        state: Arc<SharedState>,
        probe: Arc<dyn SizeProbe>,
        policy: UnreadablePolicy,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("mdu-worker-{}", id))
            .spawn(move || worker_loop(id, state, probe, policy, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".into()
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    state: Arc<SharedState>,
    probe: Arc<dyn SizeProbe>,
    policy: UnreadablePolicy,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while let Some(claim) = state.next_task() {
        let expanded = panic::catch_unwind(AssertUnwindSafe(|| {
            expand_directory(claim.path(), probe.as_ref(), policy)
        }));
        let (expansion, outcome) = match expanded {
            Ok(expanded) => expanded,
            Err(payload) => {
                // Keep the thread alive; the pool must not shrink
                error!(
                    worker = id,
                    path = %claim.path().display(),
                    message = %panic_message(payload.as_ref()),
                    "Panic while expanding directory"
                );
                stats.errors.fetch_add(1, Ordering::Relaxed);
                claim.finish(Expansion {
                    soft_errors: 1,
                    ..Expansion::default()
                });
                continue;
            }
        };
        stats.record(&expansion);

        match &outcome {
            DirOutcome::Expanded {
                path,
                entries,
                subdirs,
                soft_errors,
            } => {
                trace!(
                    worker = id,
                    path = %path.display(),
                    entries,
                    subdirs,
                    soft_errors,
                    "Directory expanded"
                );
            }
            DirOutcome::Unreadable { path } => {
                debug!(worker = id, path = %path.display(), "Directory unreadable");
            }
            DirOutcome::Failed { path, error } => {
                warn!(worker = id, path = %path.display(), error = %error, "Directory failed");
            }
        }

        claim.finish(expansion);
    }

    debug!(
        worker = id,
        dirs = stats.dirs_processed.load(Ordering::Relaxed),
        files = stats.files_found.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// List the immediate children of `path` and size them
///
/// Never touches shared state. Soft errors are counted in the returned
/// expansion; nothing here aborts the listing.
pub fn expand_directory(
    path: &Path,
    probe: &dyn SizeProbe,
    policy: UnreadablePolicy,
) -> (Expansion, DirOutcome) {
    let children = match probe.read_dir(path) {
        Ok(children) => children,
        Err(error) => {
            let mut expansion = Expansion {
                soft_errors: 1,
                ..Expansion::default()
            };
            if error.is_permission_denied() {
                report::print_unreadable(path);
                expansion.bytes = unreadable_stub(path, probe, policy);
                return (
                    expansion,
                    DirOutcome::Unreadable {
                        path: path.to_path_buf(),
                    },
                );
            }
            return (
                expansion,
                DirOutcome::Failed {
                    path: path.to_path_buf(),
                    error,
                },
            );
        }
    };

    let entries = children.len();
    let mut expansion = Expansion {
        listed: true,
        ..Expansion::default()
    };

    for child in children {
        let child = match child {
            Ok(child) => child,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Failed to read directory entry");
                expansion.soft_errors += 1;
                continue;
            }
        };

        let info = match probe.stat(&child) {
            Ok(info) => info,
            Err(error) => {
                if error.is_vanished() {
                    debug!(path = %child.display(), "Entry vanished during listing");
                } else {
                    warn!(path = %child.display(), error = %error, "Failed to stat entry");
                }
                expansion.soft_errors += 1;
                continue;
            }
        };

        match info.kind {
            EntryKind::File | EntryKind::Other => {
                expansion.bytes += info.size;
                expansion.files += 1;
            }
            EntryKind::Symlink => {
                expansion.bytes += symlink_size(&child, probe);
                expansion.files += 1;
            }
            EntryKind::Directory if info.readable => {
                expansion.subdirs.push(child);
            }
            EntryKind::Directory => {
                report::print_unreadable(&child);
                expansion.soft_errors += 1;
                if policy == UnreadablePolicy::CountEntry {
                    expansion.bytes += info.size;
                }
            }
        }
    }

    let outcome = DirOutcome::Expanded {
        path: path.to_path_buf(),
        entries,
        subdirs: expansion.subdirs.len(),
        soft_errors: expansion.soft_errors as usize,
    };
    (expansion, outcome)
}

/// Size contributed by a symlink: its target's size if that is a file
///
/// Links to directories are never followed. Broken links count as zero.
fn symlink_size(link: &Path, probe: &dyn SizeProbe) -> u64 {
    match probe.stat_target(link) {
        Ok(target) if target.kind.is_file() => target.size,
        Ok(_) => 0,
        Err(error) => {
            trace!(path = %link.display(), error = %error, "Broken symlink");
            0
        }
    }
}

/// Size charged for a directory that could not be listed
pub fn unreadable_stub(path: &Path, probe: &dyn SizeProbe, policy: UnreadablePolicy) -> u64 {
    match policy {
        UnreadablePolicy::Skip => 0,
        UnreadablePolicy::CountEntry => probe.stat(path).map_or(0, |info| info.size),
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> PoolStats {
    workers.iter().fold(PoolStats::default(), |acc, worker| PoolStats {
        dirs: acc.dirs + worker.stats.dirs_processed.load(Ordering::Relaxed),
        files: acc.files + worker.stats.files_found.load(Ordering::Relaxed),
        bytes: acc.bytes + worker.stats.bytes_found.load(Ordering::Relaxed),
        errors: acc.errors + worker.stats.errors.load(Ordering::Relaxed),
    })
}
