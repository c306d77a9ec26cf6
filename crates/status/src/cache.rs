//! In-memory status cache
//!
//! Maps normalised, case-insensitive path keys to the last status the
//! backend reported. Absence of a key means "never queried", which is
//! distinct from a record whose status is [`FileStatus::Unknown`].
//!
//! Every operation takes the internal lock once; callers must not assume
//! atomicity across calls. The lock is never held across a backend call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;
use vcstatus_core::path::PathKey;
use vcstatus_core::status::{FileIdentity, FileStatus, FileStatusRecord};

#[derive(Debug, Default)]
struct CacheState {
    records: HashMap<PathKey, FileStatusRecord>,
    /// Identities of records removed since they were last cached, kept so a
    /// later rename lookup can still match them
    removed: HashMap<PathKey, FileIdentity>,
}

/// Path-keyed store of [`FileStatusRecord`]s
#[derive(Debug, Default)]
pub struct StatusCache {
    state: Mutex<CacheState>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite records by path
    pub fn add(&self, records: impl IntoIterator<Item = FileStatusRecord>) {
        let mut state = self.state();
        for record in records {
            let key = PathKey::new(&record.path);
            state.removed.remove(&key);
            state.records.insert(key, record);
        }
    }

    /// Drop the record for `path`, returning it if present
    pub fn remove(&self, path: &Path) -> Option<FileStatusRecord> {
        let key = PathKey::new(path);
        let mut state = self.state();
        let record = state.records.remove(&key)?;
        if let Some(identity) = record.identity {
            state.removed.insert(key, identity);
        }
        Some(record)
    }

    /// Drop the records of several paths under one lock
    pub fn remove_all<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        let mut state = self.state();
        for path in paths {
            let key = PathKey::new(path);
            if let Some(identity) = state.records.remove(&key).and_then(|r| r.identity) {
                state.removed.insert(key, identity);
            }
        }
    }

    /// Drop the rename tombstones of `paths`, leaving their records alone
    pub fn forget_removed<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        let mut state = self.state();
        for path in paths {
            state.removed.remove(&PathKey::new(path));
        }
    }

    pub fn try_get(&self, path: &Path) -> Option<FileStatusRecord> {
        self.state().records.get(&PathKey::new(path)).cloned()
    }

    /// Cached status, defaulting to Unknown for never-queried paths
    pub fn status(&self, path: &Path) -> FileStatus {
        self.state()
            .records
            .get(&PathKey::new(path))
            .map(|record| record.status)
            .unwrap_or_default()
    }

    /// Rename detection for a path that disappeared.
    ///
    /// Removes `old_path` and looks for an Added record elsewhere with the
    /// identity `old_path` had when it was last cached. Returns that record's
    /// path when found. A false positive costs one extra backend call.
    pub fn file_moved(&self, old_path: &Path) -> Option<PathBuf> {
        let key = PathKey::new(old_path);
        let mut state = self.state();

        let cached = state.records.remove(&key).and_then(|r| r.identity);
        let tombstone = state.removed.remove(&key);
        let identity = cached.or(tombstone)?;

        let target = state
            .records
            .iter()
            .filter(|(other, record)| {
                **other != key
                    && record.status == FileStatus::Added
                    && record.identity == Some(identity)
            })
            .map(|(_, record)| record.path.clone())
            .min();

        if let Some(target) = &target {
            trace!("{:?} looks moved to {:?}", old_path, target);
        }
        target
    }

    /// Snapshot of every record with an uncommitted change, sorted by path
    pub fn pending_files(&self) -> Vec<FileStatusRecord> {
        let mut pending: Vec<FileStatusRecord> = self
            .state()
            .records
            .values()
            .filter(|record| record.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.path.cmp(&b.path));
        pending
    }

    /// Swap in a freshly built record set. Records later in the sequence
    /// overwrite earlier ones with the same key.
    pub fn replace(&self, records: impl IntoIterator<Item = FileStatusRecord>) {
        let fresh: HashMap<PathKey, FileStatusRecord> = records
            .into_iter()
            .map(|record| (PathKey::new(&record.path), record))
            .collect();
        let mut state = self.state();
        state.records = fresh;
        state.removed.clear();
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.records.clear();
        state.removed.clear();
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().records.is_empty()
    }
}
