//! Per-file status records
//!
//! A [`FileStatusRecord`] is what the backend reports for one path: its
//! version-control status and the on-disk identity (modification time and
//! length) observed when the status was taken. The identity is what lets the
//! reconciliation loop decide whether a watcher notification actually
//! changed anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Version-control status of a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Present on disk but not tracked; also the answer for never-queried paths
    #[default]
    Unknown,
    /// Tracked and clean
    Unmodified,
    /// Tracked with local modifications
    Modified,
    /// Scheduled for addition
    Added,
    /// Scheduled for removal or deleted from the working copy
    Removed,
    /// Recorded as the destination of a rename
    Renamed,
    /// Matched by an ignore rule
    Ignored,
    /// Unresolved merge conflict
    Conflicted,
}

impl FileStatus {
    /// Anything except Unmodified, Ignored and Unknown is an uncommitted change
    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Unmodified | Self::Ignored | Self::Unknown)
    }

    /// Short status code, one character per status
    pub fn code(self) -> char {
        match self {
            Self::Unknown => '?',
            Self::Unmodified => 'C',
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Removed => 'R',
            Self::Renamed => '>',
            Self::Ignored => 'I',
            Self::Conflicted => 'U',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Unmodified => "unmodified",
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Ignored => "ignored",
            Self::Conflicted => "conflicted",
        };
        f.write_str(name)
    }
}

/// On-disk identity of a file at the time its status was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Last write time, if the platform reports one
    pub modified: Option<SystemTime>,
    /// File length in bytes
    pub length: u64,
}

impl FileIdentity {
    pub fn new(modified: Option<SystemTime>, length: u64) -> Self {
        Self { modified, length }
    }

    /// Read the identity of an existing regular file
    pub fn from_disk(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(Self {
            modified: metadata.modified().ok(),
            length: metadata.len(),
        })
    }

    /// True when the file on disk still has this identity
    pub fn matches_disk(&self, path: &Path) -> bool {
        Self::from_disk(path).is_some_and(|current| current == *self)
    }
}

/// Status of one file as classified by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatusRecord {
    /// Absolute path, in the spelling the backend reported
    pub path: PathBuf,
    /// Version-control status
    pub status: FileStatus,
    /// Identity observed with the status; `None` when the file was absent
    /// and the backend had nothing to report
    pub identity: Option<FileIdentity>,
}

impl FileStatusRecord {
    pub fn new(path: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            identity: None,
        }
    }

    /// Attach the identity observed with this status
    pub fn with_identity(mut self, identity: FileIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Whether the file on disk no longer matches the cached identity.
    ///
    /// A missing file counts as unchanged when the cached status already
    /// says it is gone (Removed) or was never tracked (Unknown).
    pub fn has_changed_on_disk(&self) -> bool {
        if self.path.exists() {
            match &self.identity {
                Some(identity) => !identity.matches_disk(&self.path),
                None => true,
            }
        } else {
            !matches!(self.status, FileStatus::Removed | FileStatus::Unknown)
        }
    }
}
