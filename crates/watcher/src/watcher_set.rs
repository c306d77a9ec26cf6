//! The set of per-root watchers
//!
//! [`DirectoryWatcherSet`] owns one [`DirectoryWatcher`] per registered
//! root and exposes the aggregate view the reconciliation loop needs: total
//! event count, newest event time, and a combined drain.

use crate::events::WatchEventKind;
use crate::watcher::DirectoryWatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};
use vcstatus_core::config::WatcherConfig;
use vcstatus_core::path::PathKey;

/// One watcher per repository root
pub struct DirectoryWatcherSet {
    config: WatcherConfig,
    watchers: Mutex<HashMap<PathKey, DirectoryWatcher>>,
    /// Delivery switch applied to current and future watchers
    enabled: AtomicBool,
}

impl DirectoryWatcherSet {
    pub fn new(config: WatcherConfig) -> Self {
        let enabled = AtomicBool::new(config.enabled);
        Self {
            config,
            watchers: Mutex::new(HashMap::new()),
            enabled,
        }
    }

    fn watchers(&self) -> MutexGuard<'_, HashMap<PathKey, DirectoryWatcher>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start watching `root`. Returns false when it was already watched.
    ///
    /// An inaccessible root is logged and registered with a passive watcher,
    /// which never emits; it is not an error.
    pub fn watch_directory(&self, root: &Path) -> bool {
        let key = PathKey::new(root);
        let mut watchers = self.watchers();
        if watchers.contains_key(&key) {
            return false;
        }

        let watcher = match DirectoryWatcher::watch(root, &self.config) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("Unable to watch {:?}, status will not refresh: {}", root, e);
                DirectoryWatcher::passive(root)
            }
        };
        watcher.set_enabled(self.is_watching_enabled());
        watchers.insert(key, watcher);
        true
    }

    pub fn contains_directory(&self, root: &Path) -> bool {
        self.watchers().contains_key(&PathKey::new(root))
    }

    /// Number of watched roots
    pub fn len(&self) -> usize {
        self.watchers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers().is_empty()
    }

    /// Watched roots, in no particular order
    pub fn roots(&self) -> Vec<PathBuf> {
        self.watchers()
            .values()
            .map(|w| w.root().to_path_buf())
            .collect()
    }

    /// Raw change events accumulated across all watchers
    pub fn number_of_changed_files(&self) -> usize {
        self.watchers().values().map(|w| w.changed_count()).sum()
    }

    /// Newest event time across all watchers
    pub fn latest_change(&self) -> Option<Instant> {
        self.watchers()
            .values()
            .filter_map(|w| w.latest_change())
            .max()
    }

    /// Drain every watcher and reset it. Nested roots can report the same
    /// path twice; the combined result holds each path once.
    pub fn dump_dirty_files(&self) -> Vec<PathBuf> {
        let watchers = self.watchers();
        let mut combined: HashMap<PathKey, PathBuf> = HashMap::new();
        for watcher in watchers.values() {
            for path in watcher.dump_dirty_files() {
                combined.entry(PathKey::new(&path)).or_insert(path);
            }
        }
        combined.into_values().collect()
    }

    /// Route an externally observed event to the innermost watcher whose
    /// root contains `path`. Returns false when no watcher covers it.
    pub fn record_event(&self, path: &Path, kind: WatchEventKind) -> bool {
        self.record_event_at(path, kind, Instant::now())
    }

    pub fn record_event_at(&self, path: &Path, kind: WatchEventKind, at: Instant) -> bool {
        let key = PathKey::new(path);
        let watchers = self.watchers();
        let owner = watchers
            .iter()
            .filter(|(root, _)| key.is_under(root))
            .max_by_key(|(root, _)| root.len())
            .map(|(_, watcher)| watcher);

        match owner {
            Some(watcher) => {
                watcher.record_at(path, kind, at);
                true
            }
            None => {
                debug!("No watched root contains {:?}", path);
                false
            }
        }
    }

    /// Suspend or resume notification delivery without losing registrations
    pub fn enable_watching(&self, enable: bool) {
        self.enabled.store(enable, Ordering::SeqCst);
        for watcher in self.watchers().values() {
            watcher.set_enabled(enable);
        }
        info!(
            "Directory watching {}",
            if enable { "enabled" } else { "suspended" }
        );
    }

    pub fn is_watching_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Unsubscribe and forget every watcher
    pub fn clear(&self) {
        let mut watchers = self.watchers();
        for watcher in watchers.values_mut() {
            watcher.unsubscribe();
        }
        watchers.clear();
    }
}

impl Default for DirectoryWatcherSet {
    fn default() -> Self {
        Self::new(WatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn watched_set(dirs: &[&Path]) -> DirectoryWatcherSet {
        let set = DirectoryWatcherSet::default();
        for dir in dirs {
            assert!(set.watch_directory(dir));
        }
        set
    }

    #[test]
    fn test_watch_directory_is_idempotent() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let set = watched_set(&[temp_dir.path()]);
        assert!(!set.watch_directory(temp_dir.path()));
        assert_eq!(set.len(), 1);
        assert!(set.contains_directory(temp_dir.path()));
    }

    #[test]
    fn test_inaccessible_root_is_registered_passively() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let missing = temp_dir.path().join("missing");
        let set = DirectoryWatcherSet::default();
        assert!(set.watch_directory(&missing));
        assert!(set.contains_directory(&missing));
    }

    #[test]
    fn test_two_consecutive_dumps() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let set = watched_set(&[temp_dir.path()]);
        set.record_event(&temp_dir.path().join("a.txt"), WatchEventKind::Changed);

        assert_eq!(set.dump_dirty_files().len(), 1);
        assert!(set.dump_dirty_files().is_empty());
        assert!(set.dump_dirty_files().is_empty());
        assert_eq!(set.number_of_changed_files(), 0);
    }

    #[test]
    fn test_aggregates_across_roots() {
        let first = TempDir::new().expect("test setup failed");
        let second = TempDir::new().expect("test setup failed");
        let set = watched_set(&[first.path(), second.path()]);

        let base = Instant::now();
        let newest = base + Duration::from_millis(10);
        set.record_event_at(&first.path().join("a"), WatchEventKind::Changed, base);
        set.record_event_at(&second.path().join("b"), WatchEventKind::Changed, newest);
        set.record_event_at(&second.path().join("b"), WatchEventKind::Changed, base);

        assert_eq!(set.number_of_changed_files(), 3);
        assert_eq!(set.latest_change(), Some(newest));
        assert_eq!(set.dump_dirty_files().len(), 2);
    }

    #[test]
    fn test_events_route_to_innermost_root() {
        let outer = TempDir::new().expect("test setup failed");
        let inner = outer.path().join("sub");
        std::fs::create_dir(&inner).expect("test setup failed");
        let set = watched_set(&[outer.path(), &inner]);

        assert!(set.record_event(&inner.join("x.txt"), WatchEventKind::Created));
        let watchers = set.watchers();
        assert_eq!(watchers[&PathKey::new(&inner)].changed_count(), 1);
        assert_eq!(watchers[&PathKey::new(outer.path())].changed_count(), 0);
    }

    #[test]
    fn test_unwatched_path_is_not_recorded() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let set = watched_set(&[temp_dir.path()]);
        assert!(!set.record_event(Path::new("/elsewhere/file.txt"), WatchEventKind::Changed));
        assert_eq!(set.number_of_changed_files(), 0);
    }

    #[test]
    fn test_disabled_set_drops_events_but_keeps_roots() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let set = watched_set(&[temp_dir.path()]);
        set.enable_watching(false);

        set.record_event(&temp_dir.path().join("a.txt"), WatchEventKind::Changed);
        assert_eq!(set.number_of_changed_files(), 0);
        assert_eq!(set.len(), 1);

        set.enable_watching(true);
        set.record_event(&temp_dir.path().join("a.txt"), WatchEventKind::Changed);
        assert_eq!(set.number_of_changed_files(), 1);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let temp_dir = TempDir::new().expect("test setup failed");
        let set = watched_set(&[temp_dir.path()]);
        set.record_event(&temp_dir.path().join("a.txt"), WatchEventKind::Changed);
        set.clear();

        assert!(set.is_empty());
        assert_eq!(set.number_of_changed_files(), 0);
        assert!(set.latest_change().is_none());
    }
}
