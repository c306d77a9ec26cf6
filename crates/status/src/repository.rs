//! The public facade over the status cache, root registry, watchers and
//! command queue
//!
//! [`StatusRepository`] exclusively owns every structure; callers only ever
//! receive copies of query results. Mutations issued directly through the
//! facade run synchronously on the caller's thread. Mutations submitted with
//! [`StatusRepository::enqueue`] run on the next tick.

use crate::cache::StatusCache;
use crate::commands::{CommandQueue, PendingCommand};
use crate::roots::RootRegistry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use vcstatus_core::backend::StatusBackend;
use vcstatus_core::config::{Config, StatusConfig};
use vcstatus_core::error::{Error, Result};
use vcstatus_core::path::{has_trailing_separator, PathKey};
use vcstatus_core::status::{FileStatus, FileStatusRecord};
use vcstatus_watcher::{DirectoryWatcherSet, WatchEventKind};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Payload-free signal that cached status changed; receivers re-query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChanged;

/// Marks an update bracket; the bracket ends when the guard is dropped
#[must_use = "the update bracket ends when the guard is dropped"]
pub struct UpdateGuard<'a> {
    depth: &'a AtomicUsize,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Live version-control status for every file under the registered roots
pub struct StatusRepository {
    pub(crate) backend: Arc<dyn StatusBackend>,
    pub(crate) config: StatusConfig,
    pub(crate) cache: StatusCache,
    pub(crate) roots: RootRegistry,
    pub(crate) watchers: DirectoryWatcherSet,
    pub(crate) commands: CommandQueue,
    /// Nesting depth of update brackets
    update_depth: AtomicUsize,
    /// Sticky request for a full rebuild on the next eligible tick
    pub(crate) rebuild_required: AtomicBool,
    /// Set after our own mutations so the metadata write they cause is
    /// not mistaken for an external change
    pub(crate) expect_metadata_write: AtomicBool,
    build_in_progress: AtomicBool,
    /// Serialises ticks
    pub(crate) tick_lock: Mutex<()>,
    changed: broadcast::Sender<StatusChanged>,
}

impl StatusRepository {
    pub fn new(backend: Arc<dyn StatusBackend>, config: &Config) -> Self {
        Self::with_watchers(
            backend,
            config.status.clone(),
            DirectoryWatcherSet::new(config.watcher.clone()),
        )
    }

    pub fn with_watchers(
        backend: Arc<dyn StatusBackend>,
        config: StatusConfig,
        watchers: DirectoryWatcherSet,
    ) -> Self {
        let (changed, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend,
            config,
            cache: StatusCache::new(),
            roots: RootRegistry::new(),
            watchers,
            commands: CommandQueue::new(),
            update_depth: AtomicUsize::new(0),
            rebuild_required: AtomicBool::new(false),
            expect_metadata_write: AtomicBool::new(false),
            build_in_progress: AtomicBool::new(false),
            tick_lock: Mutex::new(()),
            changed,
        }
    }

    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    /// Register the repository enclosing `path`, start watching it and
    /// cache its full status.
    ///
    /// Returns the newly registered root; `None` when no repository encloses
    /// `path` or its root is already registered.
    pub fn add_root_directory(&self, path: &Path) -> Option<PathBuf> {
        if path.as_os_str().is_empty() {
            return None;
        }
        let Some(root) = self.backend.find_repository_root(path) else {
            debug!("No repository encloses {:?}", path);
            return None;
        };
        if self.roots.contains(&root) {
            return None;
        }

        let branch = self.backend.current_branch(&root).unwrap_or_else(|e| {
            warn!("Unable to read branch of {:?}: {}", root, e);
            String::new()
        });
        if !self.roots.register(&root, branch) {
            return None;
        }
        self.watchers.watch_directory(&root);
        info!("Registered repository root {:?}", root);

        self.update_root_status(&root);
        Some(root)
    }

    /// Stage files for addition; files cached as Ignored are skipped
    pub fn add_files(&self, paths: &[PathBuf]) {
        self.apply_add(paths);
    }

    /// Stage files for removal. A removed file whose identity matches a
    /// newly added file is recorded as a rename instead.
    pub fn remove_files(&self, paths: &[PathBuf]) {
        self.apply_remove(paths);
    }

    /// Record renames pairwise. Fails when the lists differ in length.
    pub fn rename_files(&self, from: &[PathBuf], to: &[PathBuf]) -> Result<()> {
        self.apply_rename(from, to).map(|_| ())
    }

    /// Queue a command for the next tick
    pub fn enqueue(&self, command: PendingCommand) {
        self.commands.enqueue(command);
    }

    /// Re-query the status of specific files now
    pub fn update_file_status(&self, paths: &[PathBuf]) {
        self.refresh_files(paths);
    }

    /// Re-scan a whole root now
    pub fn update_root_status(&self, root: &Path) {
        match self.backend.root_status(root) {
            Ok(records) => {
                debug!("Cached {} records for {:?}", records.len(), root);
                self.cache.add(records);
            }
            Err(e) => warn!("Status query for {:?} failed: {}", root, e),
        }
    }

    /// Cached status, Unknown if the path was never classified
    pub fn file_status(&self, path: &Path) -> FileStatus {
        self.cache.status(path)
    }

    pub fn file_record(&self, path: &Path) -> Option<FileStatusRecord> {
        self.cache.try_get(path)
    }

    pub fn pending_files(&self) -> Vec<FileStatusRecord> {
        self.cache.pending_files()
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.roots.branch_names()
    }

    pub fn directory_branch(&self, root: &Path) -> Option<String> {
        self.roots.branch(root)
    }

    /// Innermost registered root containing `path`
    pub fn root_for(&self, path: &Path) -> Option<PathBuf> {
        self.roots.root_for(path)
    }

    /// Registered roots, parents first
    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots.roots_by_depth()
    }

    /// True when nothing is under watch
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Forget all roots, watchers, commands and cached status
    pub fn clear_cache(&self) {
        self.watchers.clear();
        self.roots.clear();
        self.cache.clear();
        self.commands.clear();
        self.rebuild_required.store(false, Ordering::SeqCst);
        self.expect_metadata_write.store(false, Ordering::SeqCst);
        info!("Status cache cleared");
    }

    /// Force a full rebuild on the next eligible tick
    pub fn set_cache_dirty(&self) {
        self.rebuild_required.store(true, Ordering::SeqCst);
    }

    pub fn is_rebuild_required(&self) -> bool {
        self.rebuild_required.load(Ordering::SeqCst)
    }

    /// Open an update bracket. While any bracket is open, metadata-file
    /// changes are treated as self-caused.
    pub fn begin_update(&self) -> UpdateGuard<'_> {
        self.update_depth.fetch_add(1, Ordering::SeqCst);
        UpdateGuard {
            depth: &self.update_depth,
        }
    }

    pub fn is_updating(&self) -> bool {
        self.update_depth.load(Ordering::SeqCst) > 0
    }

    /// Suspend watcher-driven reconciliation while an external build runs
    pub fn set_build_in_progress(&self, building: bool) {
        self.build_in_progress.store(building, Ordering::SeqCst);
        debug!("Build in progress: {}", building);
    }

    pub fn is_build_in_progress(&self) -> bool {
        self.build_in_progress.load(Ordering::SeqCst)
    }

    /// Suspend or resume filesystem notification delivery
    pub fn enable_watching(&self, enable: bool) {
        self.watchers.enable_watching(enable);
    }

    /// Feed a change notification from an external source
    pub fn record_fs_event(&self, path: &Path, kind: WatchEventKind) -> bool {
        self.watchers.record_event(path, kind)
    }

    pub fn record_fs_event_at(&self, path: &Path, kind: WatchEventKind, at: Instant) -> bool {
        self.watchers.record_event_at(path, kind, at)
    }

    /// Subscribe to [`StatusChanged`] signals
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChanged> {
        self.changed.subscribe()
    }

    pub(crate) fn notify_changed(&self) {
        // No receivers is fine
        let _ = self.changed.send(StatusChanged);
    }

    /// Query the backend for `paths` and merge the result. Returns the
    /// number of records merged.
    pub(crate) fn refresh_files(&self, paths: &[PathBuf]) -> usize {
        if paths.is_empty() {
            return 0;
        }
        match self.backend.file_status(paths) {
            Ok(records) => {
                let count = records.len();
                self.cache.add(records);
                count
            }
            Err(e) => {
                warn!("Status query for {} files failed: {}", paths.len(), e);
                0
            }
        }
    }

    /// Merge the records a mutation returned. Only a successful mutation
    /// arms the metadata-write expectation; a failed one wrote nothing and
    /// leaves no rename tombstones behind for `paths`.
    fn merge_mutation(
        &self,
        operation: &str,
        paths: &[PathBuf],
        result: Result<Vec<FileStatusRecord>>,
    ) {
        match result {
            Ok(records) => {
                self.cache.add(records);
                self.expect_metadata_write.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                warn!("Backend {} failed: {}", operation, e);
                self.cache.forget_removed(paths);
            }
        }
    }

    pub(crate) fn apply_add(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let paths: Vec<PathBuf> = paths
            .iter()
            .filter(|path| self.cache.status(path) != FileStatus::Ignored)
            .cloned()
            .collect();
        if paths.is_empty() {
            return paths;
        }

        let _update = self.begin_update();
        self.merge_mutation("add", &paths, self.backend.add_files(&paths));
        paths
    }

    pub(crate) fn apply_remove(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        let mut moved_from = Vec::new();
        let mut moved_to = Vec::new();
        for path in paths {
            match self.cache.file_moved(path) {
                Some(target) => {
                    moved_from.push(path.clone());
                    moved_to.push(target);
                }
                None => removed.push(path.clone()),
            }
        }

        let _update = self.begin_update();
        let mut affected = Vec::new();
        if !removed.is_empty() {
            self.merge_mutation("remove", &removed, self.backend.remove_files(&removed));
            affected.extend(removed);
        }
        if !moved_from.is_empty() {
            debug!("Treating {} removals as renames", moved_from.len());
            match self.apply_rename(&moved_from, &moved_to) {
                Ok(renamed) => affected.extend(renamed),
                Err(e) => warn!("Rename detection failed: {}", e),
            }
        }
        affected
    }

    pub(crate) fn apply_rename(&self, from: &[PathBuf], to: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if from.len() != to.len() {
            return Err(Error::invalid_input(format!(
                "Rename needs one destination per source ({} sources, {} destinations)",
                from.len(),
                to.len()
            )));
        }

        let (from, to): (Vec<PathBuf>, Vec<PathBuf>) = from
            .iter()
            .zip(to)
            .filter(|(old, new)| {
                // Directory targets are skipped; so are case-only renames
                !has_trailing_separator(new) && PathKey::new(old) != PathKey::new(new)
            })
            .map(|(old, new)| (old.clone(), new.clone()))
            .unzip();
        if from.is_empty() {
            return Ok(Vec::new());
        }

        self.cache.remove_all(from.iter().chain(&to));

        let _update = self.begin_update();
        let touched: Vec<PathBuf> = from.iter().chain(&to).cloned().collect();
        self.merge_mutation("rename", &touched, self.backend.rename_files(&from, &to));

        let mut seen = HashSet::new();
        Ok(from
            .into_iter()
            .chain(to)
            .filter(|path| seen.insert(PathKey::new(path)))
            .collect())
    }
}
