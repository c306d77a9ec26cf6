//! Raw change event kinds
//!
//! The watcher layer does not interpret events beyond deciding whether they
//! are changes at all; reads and metadata-less access notifications are
//! dropped, everything else is recorded against its path.

use notify::event::{EventKind, ModifyKind};
use std::fmt;

/// Kind of filesystem change delivered for a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A file or directory appeared
    Created,
    /// Contents or metadata changed
    Changed,
    /// The path was the source or destination of a rename
    Renamed,
    /// The path disappeared
    Deleted,
}

impl WatchEventKind {
    /// Map a notify event kind, returning `None` for non-changes (access, unknown)
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(_) => Some(Self::Changed),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Renamed => "renamed",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}
