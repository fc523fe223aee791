//! Filesystem probe: the single point where mdu touches the disk
//!
//! Workers never call `std::fs` directly. Every size query, type check and
//! directory listing goes through a [`SizeProbe`], so the traversal engine
//! can be driven by the real filesystem ([`FsProbe`]) or by a synthetic
//! tree in tests.

use crate::error::{ProbeError, ProbeResult};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Device, FIFO, socket or anything else
    Other,
}

impl EntryKind {
    fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryKind::Directory
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryKind::File
    }
}

/// File permissions (Unix mode bits without type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(pub u32);

impl Permissions {
    /// Create from full mode (strips type bits)
    pub fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Check if owner can read
    pub fn owner_read(&self) -> bool {
        self.0 & 0o400 != 0
    }
}

/// What a probe knows about one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub kind: EntryKind,

    /// Size in bytes as reported by the filesystem
    pub size: u64,

    /// Whether the entry may be listed (only meaningful for directories)
    pub readable: bool,
}

impl EntryInfo {
    pub fn file(size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            readable: true,
        }
    }

    pub fn directory(size: u64, readable: bool) -> Self {
        Self {
            kind: EntryKind::Directory,
            size,
            readable,
        }
    }
}

/// Queries sizes and types of filesystem entries
///
/// Implementations must be shareable across the worker pool.
pub trait SizeProbe: Send + Sync {
    /// Stat `path` without following a final symlink
    fn stat(&self, path: &Path) -> ProbeResult<EntryInfo>;

    /// Stat `path`, following symlinks to their target
    fn stat_target(&self, path: &Path) -> ProbeResult<EntryInfo>;

    /// List the immediate children of a directory, as full paths
    ///
    /// The outer error means the directory could not be opened at all. An
    /// entry that fails mid-listing is reported in place, so its siblings
    /// are still returned.
    fn read_dir(&self, path: &Path) -> ProbeResult<Vec<ProbeResult<PathBuf>>>;
}

/// [`SizeProbe`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FsProbe {
    pub fn new() -> Self {
        Self
    }

    fn info(meta: &Metadata) -> EntryInfo {
        let kind = EntryKind::from_metadata(meta);
        EntryInfo {
            kind,
            size: meta.len(),
            readable: is_readable(meta),
        }
    }
}

/// Readability is judged from the owner-read permission bit, not from the
/// effective uid, so results do not depend on who runs the scan.
#[cfg(unix)]
fn is_readable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(meta.permissions().mode()).owner_read()
}

#[cfg(not(unix))]
fn is_readable(_meta: &Metadata) -> bool {
    true
}

impl SizeProbe for FsProbe {
    fn stat(&self, path: &Path) -> ProbeResult<EntryInfo> {
        fs::symlink_metadata(path)
            .map(|m| Self::info(&m))
            .map_err(|e| ProbeError::from_io(path, e))
    }

    fn stat_target(&self, path: &Path) -> ProbeResult<EntryInfo> {
        fs::metadata(path)
            .map(|m| Self::info(&m))
            .map_err(|e| ProbeError::from_io(path, e))
    }

    fn read_dir(&self, path: &Path) -> ProbeResult<Vec<ProbeResult<PathBuf>>> {
        let iter = fs::read_dir(path).map_err(|e| ProbeError::from_io(path, e))?;

        Ok(iter
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .map_err(|e| ProbeError::from_io(path, e))
            })
            .collect())
    }
}
