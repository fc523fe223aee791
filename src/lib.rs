//! mdu - Multithreaded Disk Usage
//!
//! Computes the total byte size of directory trees by traversing them with a
//! fixed pool of worker threads instead of single-threaded recursion.
//!
//! # Features
//!
//! - **Shared Work Stack**: Pending subdirectories live on one
//!   mutex-protected stack, so N workers expand different branches of the
//!   same tree at once.
//!
//! - **I/O Outside the Lock**: Directory listing and size queries happen outside
//!   the lock; only pushes and totals are serialized.
//!
//! - **Exact Termination**: A tree is done when the stack is empty and no
//!   worker is busy, checked atomically under the lock. No polling.
//!
//! - **Soft Errors**: Unreadable or vanishing entries are reported and
//!   flagged, never fatal.
//!
//! # Example
//!
//! ```bash
//! # Single-threaded
//! mdu /var/log
//!
//! # Eight workers, several roots, human-readable sizes
//! mdu -j 8 -H /usr /opt /home
//! ```
//!
//! ```no_run
//! use mdu::{Controller, MduConfig};
//!
//! let config = MduConfig::new(4);
//! let controller = Controller::new(&config)?;
//! let report = controller.measure(std::path::Path::new("/usr/share"))?;
//! println!("{:?}", report.size());
//! controller.shutdown();
//! # Ok::<(), mdu::MduError>(())
//! ```

pub mod config;
pub mod error;
pub mod probe;
pub mod report;
pub mod walker;

pub use config::{CliArgs, MduConfig, UnreadablePolicy};
pub use error::{MduError, Result};
pub use probe::{EntryInfo, EntryKind, FsProbe, SizeProbe};
pub use walker::{Controller, JobResult, RootOutcome, RootReport, RunSummary};
