//! Translation from git2 status flags and index entries to the core model

use git2::{IndexEntry, Status};
use std::time::{Duration, UNIX_EPOCH};
use vcstatus_core::status::{FileIdentity, FileStatus};

/// Collapse a set of git status flags into a single [`FileStatus`]
///
/// Flags are checked from most to least significant, so a file that is both
/// staged as new and modified in the worktree reads as Added.
pub fn map_status(status: Status) -> FileStatus {
    if status.is_conflicted() {
        FileStatus::Conflicted
    } else if status.intersects(Status::INDEX_RENAMED | Status::WT_RENAMED) {
        FileStatus::Renamed
    } else if status.contains(Status::INDEX_NEW) {
        FileStatus::Added
    } else if status.intersects(Status::INDEX_DELETED | Status::WT_DELETED) {
        FileStatus::Removed
    } else if status.intersects(
        Status::INDEX_MODIFIED
            | Status::WT_MODIFIED
            | Status::INDEX_TYPECHANGE
            | Status::WT_TYPECHANGE,
    ) {
        FileStatus::Modified
    } else if status.is_ignored() {
        FileStatus::Ignored
    } else if status.contains(Status::WT_NEW) {
        FileStatus::Unknown
    } else {
        FileStatus::Unmodified
    }
}

/// Identity recorded in the index for a file that may no longer exist
pub fn index_identity(entry: &IndexEntry) -> FileIdentity {
    let modified = u64::try_from(entry.mtime.seconds())
        .ok()
        .map(|secs| UNIX_EPOCH + Duration::new(secs, entry.mtime.nanoseconds()));
    FileIdentity::new(modified, u64::from(entry.file_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_file_is_unmodified() {
        assert_eq!(map_status(Status::CURRENT), FileStatus::Unmodified);
    }

    #[test]
    fn test_worktree_flags() {
        assert_eq!(map_status(Status::WT_NEW), FileStatus::Unknown);
        assert_eq!(map_status(Status::WT_MODIFIED), FileStatus::Modified);
        assert_eq!(map_status(Status::WT_TYPECHANGE), FileStatus::Modified);
        assert_eq!(map_status(Status::WT_DELETED), FileStatus::Removed);
        assert_eq!(map_status(Status::IGNORED), FileStatus::Ignored);
    }

    #[test]
    fn test_index_flags_win_over_worktree() {
        assert_eq!(
            map_status(Status::INDEX_NEW | Status::WT_MODIFIED),
            FileStatus::Added
        );
        assert_eq!(
            map_status(Status::INDEX_DELETED | Status::WT_NEW),
            FileStatus::Removed
        );
        assert_eq!(
            map_status(Status::INDEX_RENAMED | Status::WT_MODIFIED),
            FileStatus::Renamed
        );
    }

    #[test]
    fn test_conflict_wins_over_everything() {
        assert_eq!(
            map_status(Status::CONFLICTED | Status::WT_MODIFIED),
            FileStatus::Conflicted
        );
    }
}
