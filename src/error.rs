//! Error types for mdu
//!
//! This module defines the error hierarchy:
//! - Configuration errors (fatal, raised before any traversal starts)
//! - Probe errors (a single filesystem query failed)
//! - Worker errors (thread spawn/join and protocol misuse)
//!
//! Soft traversal errors (permission denied, entries vanishing mid-listing)
//! are classified through `ProbeError` but never propagate as `Err` out of
//! the worker or controller loops. They are folded into the job's error
//! flag instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for mdu
#[derive(Error, Debug)]
pub enum MduError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Errors from querying a single filesystem entry
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The caller lacks permission
    #[error("Permission denied: '{}'", .path.display())]
    PermissionDenied { path: PathBuf },

    /// The entry does not exist (or vanished after being listed)
    #[error("No such file or directory: '{}'", .path.display())]
    NotFound { path: PathBuf },

    /// Any other I/O failure
    #[error("I/O error on '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    /// Classify an `io::Error` raised while touching `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied {
                path: path.to_path_buf(),
            },
            io::ErrorKind::NotFound => ProbeError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ProbeError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// The entry disappeared between being listed and being queried
    pub fn is_vanished(&self) -> bool {
        matches!(self, ProbeError::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ProbeError::PermissionDenied { .. })
    }

    /// Short human-readable cause, without the path
    pub fn reason(&self) -> String {
        match self {
            ProbeError::PermissionDenied { .. } => "Permission denied".into(),
            ProbeError::NotFound { .. } => "No such file or directory".into(),
            ProbeError::Io { source, .. } => source.to_string(),
        }
    }

    /// Path the failed query was about
    pub fn path(&self) -> &Path {
        match self {
            ProbeError::PermissionDenied { path } => path,
            ProbeError::NotFound { path } => path,
            ProbeError::Io { path, .. } => path,
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Zero worker threads can never drain a job
    #[error("Invalid thread count {count}: at least one worker thread is required")]
    InvalidThreadCount { count: usize },

    /// Nothing to measure
    #[error("No paths given to measure")]
    NoPaths,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// A job was installed while another was still in flight
    #[error("A job for '{}' is already in flight", .active.display())]
    JobInFlight { active: PathBuf },

    /// Shutdown was already requested
    #[error("Worker pool is shutting down")]
    ShuttingDown,

    /// The installed job disappeared before completing
    #[error("Job for '{}' was lost before completion", .root.display())]
    JobLost { root: PathBuf },
}

/// Result type alias for MduError
pub type Result<T> = std::result::Result<T, MduError>;

/// Result type alias for ProbeError
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Represents the outcome of expanding a single directory
#[derive(Debug)]
pub enum DirOutcome {
    /// Listed successfully
    Expanded {
        path: PathBuf,
        entries: usize,
        subdirs: usize,
        soft_errors: usize,
    },

    /// Directory could not be listed due to permissions
    Unreadable { path: PathBuf },

    /// Listing failed for another reason (vanished, I/O error)
    Failed { path: PathBuf, error: ProbeError },
}

impl DirOutcome {
    /// True when the directory was listed without any soft error
    pub fn is_clean(&self) -> bool {
        matches!(self, DirOutcome::Expanded { soft_errors: 0, .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &Path {
        match self {
            DirOutcome::Expanded { path, .. } => path,
            DirOutcome::Unreadable { path } => path,
            DirOutcome::Failed { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_classification() {
        let path = Path::new("/data/x");

        let denied = ProbeError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(denied.is_permission_denied());
        assert!(!denied.is_vanished());

        let gone = ProbeError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(gone.is_vanished());
        assert_eq!(gone.path(), path);

        let other = ProbeError::from_io(path, io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert!(matches!(other, ProbeError::Io { .. }));
    }

    #[test]
    fn test_error_conversion() {
        let err = ConfigError::InvalidThreadCount { count: 0 };
        let top: MduError = err.into();
        assert!(matches!(top, MduError::Config(_)));
        assert!(top.to_string().contains("Invalid thread count 0"));

        let top: MduError = WorkerError::ShuttingDown.into();
        assert!(matches!(top, MduError::Worker(WorkerError::ShuttingDown)));
    }

    #[test]
    fn test_dir_outcome() {
        let ok = DirOutcome::Expanded {
            path: PathBuf::from("/a"),
            entries: 3,
            subdirs: 1,
            soft_errors: 0,
        };
        assert!(ok.is_clean());

        let denied = DirOutcome::Unreadable {
            path: PathBuf::from("/b"),
        };
        assert!(!denied.is_clean());
        assert_eq!(denied.path(), Path::new("/b"));
    }
}
