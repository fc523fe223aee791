//! Shared traversal state and its synchronization protocol
//!
//! All mutable state visible to more than one thread lives in [`SharedState`]:
//! the active [`Job`] (a stack of pending directories plus running totals),
//! the busy-worker counter, and the shutdown flag. One mutex guards all of
//! it, and two condition variables serve two audiences:
//!
//! - `work_available`: idle workers. Notified when a job is installed,
//!   when subdirectories are pushed, when a worker finishes a directory,
//!   and on shutdown.
//! - `job_complete`: the controller. Notified exactly once per job, when
//!   the stack is empty and no worker is busy.
//!
//! A job is complete iff `pending.is_empty() && busy == 0`, and that
//! predicate is only ever evaluated while holding the lock. An empty stack
//! alone proves nothing: a busy worker may still be listing a directory and
//! about to push more work.

use crate::error::WorkerError;
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};

/// Traversal state for exactly one root
#[derive(Debug)]
pub struct Job {
    root: PathBuf,

    /// Directories waiting to be listed (LIFO)
    pending: Vec<PathBuf>,

    /// Bytes found so far, never decreases
    total: u64,

    /// Set once any soft error was recorded
    had_error: bool,

    dirs: u64,
    files: u64,
    soft_errors: u64,

    /// Set once the completion signal has been raised
    complete: bool,
}

impl Job {
    fn new(root: PathBuf) -> Self {
        Self {
            pending: vec![root.clone()],
            root,
            total: 0,
            had_error: false,
            dirs: 0,
            files: 0,
            soft_errors: 0,
            complete: false,
        }
    }

    fn merge(&mut self, expansion: Expansion) {
        self.pending.extend(expansion.subdirs);
        self.total += expansion.bytes;
        self.files += expansion.files;
        if expansion.listed {
            self.dirs += 1;
        }
        if expansion.soft_errors > 0 {
            self.soft_errors += expansion.soft_errors;
            self.had_error = true;
        }
    }

    fn into_result(self) -> JobResult {
        JobResult {
            root: self.root,
            total: self.total,
            had_error: self.had_error,
            dirs: self.dirs,
            files: self.files,
            soft_errors: self.soft_errors,
        }
    }
}

/// Final numbers for a completed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub root: PathBuf,

    /// Sum of all sized entries in the tree
    pub total: u64,

    /// At least one soft error occurred
    pub had_error: bool,

    /// Directories successfully listed
    pub dirs: u64,

    /// Files and symlinks sized
    pub files: u64,

    /// Soft errors recorded
    pub soft_errors: u64,
}

/// What one worker found while listing one directory
///
/// Built without holding the lock, then merged in a single critical
/// section by [`Claim::finish`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Readable subdirectories to push
    pub subdirs: Vec<PathBuf>,

    /// Bytes from files and symlinks
    pub bytes: u64,

    /// Entries sized
    pub files: u64,

    /// Soft errors hit during the listing
    pub soft_errors: u64,

    /// The directory itself could be listed
    pub listed: bool,
}

#[derive(Debug)]
struct Inner {
    job: Option<Job>,
    busy: usize,
    shutting_down: bool,
}

/// State shared by the controller and every worker
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<Inner>,
    work_available: Condvar,
    job_complete: Condvar,
    pool_size: usize,
}

impl SharedState {
    /// Create state for a pool of `pool_size` workers
    pub fn new(pool_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                job: None,
                busy: 0,
                shutting_down: false,
            }),
            work_available: Condvar::new(),
            job_complete: Condvar::new(),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Install a job for `root` and wake one idle worker
    ///
    /// Fails if a job is still installed (complete or not) or the pool is
    /// shutting down. Only one job is ever in flight.
    pub fn install_job(&self, root: PathBuf) -> Result<(), WorkerError> {
        let mut inner = self.inner.lock();
        if inner.shutting_down {
            return Err(WorkerError::ShuttingDown);
        }
        if let Some(active) = &inner.job {
            return Err(WorkerError::JobInFlight {
                active: active.root.clone(),
            });
        }

        inner.job = Some(Job::new(root));
        self.work_available.notify_one();
        Ok(())
    }

    /// Block until the installed job is complete, then remove and return it
    ///
    /// Returns `None` if no job is installed.
    pub fn await_completion(&self) -> Option<JobResult> {
        let mut inner = self.inner.lock();
        loop {
            match inner.job.as_ref() {
                None => return None,
                Some(job) if job.complete => break,
                Some(_) => {}
            }
            self.job_complete.wait(&mut inner);
        }
        inner.job.take().map(Job::into_result)
    }

    /// Tell every worker to exit once it next goes idle
    pub fn request_shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutting_down = true;
        self.work_available.notify_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.lock().shutting_down
    }

    /// Pop a pending directory, waiting until one is available
    ///
    /// Returns `None` only when shutdown was requested. The returned claim
    /// counts as one busy worker until it is finished or dropped.
    pub fn next_task(&self) -> Option<Claim<'_>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutting_down {
                return None;
            }

            let state = &mut *inner;
            if let Some(job) = state.job.as_mut().filter(|job| !job.complete) {
                if let Some(path) = job.pending.pop() {
                    state.busy += 1;
                    debug_assert!(state.busy <= self.pool_size);
                    return Some(Claim {
                        state: self,
                        path,
                        released: false,
                    });
                }
            }

            // Stack is empty. Either an in-flight listing may still push
            // work, or the job is done and we idle until the next one.
            self.signal_if_complete(state);
            self.work_available.wait(&mut inner);
        }
    }

    /// Number of workers currently listing a directory
    pub fn busy_workers(&self) -> usize {
        self.inner.lock().busy
    }

    /// Directories waiting on the stack of the installed job
    pub fn pending_len(&self) -> usize {
        self.inner
            .lock()
            .job
            .as_ref()
            .map_or(0, |job| job.pending.len())
    }

    /// Bytes accumulated so far by the installed job
    pub fn current_total(&self) -> Option<u64> {
        self.inner.lock().job.as_ref().map(|job| job.total)
    }

    fn signal_if_complete(&self, inner: &mut Inner) {
        if inner.busy != 0 {
            return;
        }
        if let Some(job) = inner.job.as_mut() {
            if !job.complete && job.pending.is_empty() {
                job.complete = true;
                self.job_complete.notify_one();
            }
        }
    }

    fn release(&self, expansion: Option<Expansion>) {
        let mut inner = self.inner.lock();
        let state = &mut *inner;

        if let Some(job) = state.job.as_mut() {
            match expansion {
                Some(expansion) => job.merge(expansion),
                None => {
                    job.had_error = true;
                    job.soft_errors += 1;
                }
            }
        }

        state.busy -= 1;
        self.signal_if_complete(state);
        self.work_available.notify_all();
    }

    fn with_job(&self, f: impl FnOnce(&mut Job)) {
        let mut inner = self.inner.lock();
        if let Some(job) = inner.job.as_mut() {
            f(job);
        }
    }
}

/// A directory popped by one worker
///
/// Finishing the claim merges its results and releases the busy slot. A
/// claim dropped without being finished (the worker unwound mid-listing)
/// still releases the slot and marks the job as errored.
#[derive(Debug)]
pub struct Claim<'a> {
    state: &'a SharedState,
    path: PathBuf,
    released: bool,
}

impl<'a> Claim<'a> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Push one subdirectory immediately
    pub fn push_subdir(&self, path: PathBuf) {
        self.state.with_job(|job| job.pending.push(path));
        self.state.work_available.notify_all();
    }

    /// Add bytes to the job total immediately
    pub fn add_size(&self, delta: u64) {
        self.state.with_job(|job| job.total += delta);
    }

    /// Flag the job as errored immediately
    pub fn mark_error(&self) {
        self.state.with_job(|job| {
            job.had_error = true;
            job.soft_errors += 1;
        });
    }

    /// Merge `expansion` and release the busy slot in one critical section
    pub fn finish(mut self, expansion: Expansion) {
        self.released = true;
        self.state.release(Some(expansion));
    }
}

impl<'a> Drop for Claim<'a> {
    fn drop(&mut self) {
        if !self.released {
            self.state.release(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn expansion(subdirs: &[&str], bytes: u64) -> Expansion {
        Expansion {
            subdirs: subdirs.iter().map(PathBuf::from).collect(),
            bytes,
            files: 1,
            soft_errors: 0,
            listed: true,
        }
    }

    #[test]
    fn test_single_threaded_protocol() {
        let state = SharedState::new(1);
        state.install_job("/r".into()).unwrap();
        assert_eq!(state.pending_len(), 1);

        let claim = state.next_task().unwrap();
        assert_eq!(claim.path(), Path::new("/r"));
        assert_eq!(state.busy_workers(), 1);
        assert_eq!(state.pending_len(), 0);
        claim.finish(expansion(&["/r/a", "/r/b"], 10));

        assert_eq!(state.busy_workers(), 0);
        assert_eq!(state.pending_len(), 2);

        let a = state.next_task().unwrap();
        a.finish(expansion(&[], 5));
        let b = state.next_task().unwrap();
        b.finish(expansion(&[], 7));

        let result = state.await_completion().unwrap();
        assert_eq!(result.root, PathBuf::from("/r"));
        assert_eq!(result.total, 22);
        assert_eq!(result.dirs, 3);
        assert!(!result.had_error);

        // Job was consumed
        assert!(state.await_completion().is_none());
    }

    #[test]
    fn test_one_job_at_a_time() {
        let state = SharedState::new(1);
        state.install_job("/first".into()).unwrap();
        let err = state.install_job("/second".into()).unwrap_err();
        assert!(matches!(err, WorkerError::JobInFlight { .. }));

        state.next_task().unwrap().finish(Expansion::default());
        state.await_completion().unwrap();
        state.install_job("/second".into()).unwrap();
    }

    #[test]
    fn test_install_after_shutdown() {
        let state = SharedState::new(1);
        state.request_shutdown();
        assert!(state.is_shutting_down());
        assert!(matches!(
            state.install_job("/r".into()),
            Err(WorkerError::ShuttingDown)
        ));
        assert!(state.next_task().is_none());
    }

    #[test]
    fn test_dropped_claim_marks_error() {
        let state = SharedState::new(1);
        state.install_job("/r".into()).unwrap();

        let claim = state.next_task().unwrap();
        claim.add_size(3);
        drop(claim);

        assert_eq!(state.busy_workers(), 0);
        let result = state.await_completion().unwrap();
        assert!(result.had_error);
        assert_eq!(result.total, 3);
    }

    #[test]
    fn test_immediate_operations() {
        let state = SharedState::new(1);
        state.install_job("/r".into()).unwrap();

        let claim = state.next_task().unwrap();
        claim.push_subdir("/r/x".into());
        claim.add_size(100);
        claim.mark_error();
        assert_eq!(state.pending_len(), 1);
        assert_eq!(state.current_total(), Some(100));
        claim.finish(Expansion::default());

        state.next_task().unwrap().finish(expansion(&[], 1));
        let result = state.await_completion().unwrap();
        assert_eq!(result.total, 101);
        assert!(result.had_error);
        assert_eq!(result.soft_errors, 1);
    }

    #[test]
    fn test_shutdown_wakes_idle_workers() {
        let state = Arc::new(SharedState::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || state.next_task().is_none())
            })
            .collect();

        state.request_shutdown();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_concurrent_fan_out() {
        // Every node of a 4-ary tree of depth 4 contributes one byte
        const FANOUT: usize = 4;
        const DEPTH: usize = 4;
        let expected: u64 = (0..=DEPTH as u32).map(|d| (FANOUT as u64).pow(d)).sum();

        let workers = 4;
        let state = Arc::new(SharedState::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    while let Some(claim) = state.next_task() {
                        let depth = claim.path().components().count() - 1;
                        let subdirs = if depth < DEPTH {
                            (0..FANOUT).map(|i| claim.path().join(i.to_string())).collect()
                        } else {
                            Vec::new()
                        };
                        claim.finish(Expansion {
                            subdirs,
                            bytes: 1,
                            files: 1,
                            soft_errors: 0,
                            listed: true,
                        });
                    }
                })
            })
            .collect();

        for _ in 0..3 {
            state.install_job(PathBuf::from("r")).unwrap();
            let result = state.await_completion().unwrap();
            assert_eq!(result.total, expected);
            assert_eq!(result.dirs, expected);
        }

        state.request_shutdown();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
