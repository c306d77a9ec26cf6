//! One reconciliation tick
//!
//! A tick merges the three inputs of the engine into the cache, in strict
//! priority order:
//!
//! 1. Queued commands. When any are pending they all run, the paths they
//!    touched are re-queried in one batch, and the tick ends.
//! 2. Nothing happens while an external build is in progress.
//! 3. Nothing happens until the watchers have been quiet for the configured
//!    quiet period.
//! 4. A pending rebuild request, or more accumulated events than the rebuild
//!    threshold, triggers a full rebuild.
//! 5. Otherwise the dirty paths are drained, classified, and the genuinely
//!    changed ones are re-queried in one batch.
//!
//! Ticks never overlap and never return an error: backend failures are
//! logged and leave the cache stale for the affected paths.

use crate::commands::PendingCommand;
use crate::repository::StatusRepository;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::time::Instant;
use tracing::{debug, info, trace, warn};
use vcstatus_core::path::PathKey;

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Queued commands ran; `refreshed` records were merged afterwards
    Commands { executed: usize, refreshed: usize },
    /// An external build is running
    Suspended,
    /// Events arrived too recently
    Settling,
    /// The cache was rebuilt from every root
    Rebuilt { roots: usize, records: usize },
    /// Dirty files were re-queried
    Updated { files: usize },
    /// A metadata change requested a rebuild; it runs on a later tick
    Deferred,
    /// Nothing to do
    Idle,
}

impl TickOutcome {
    /// Whether this tick fired the change notification
    pub fn notified(&self) -> bool {
        matches!(
            self,
            Self::Commands { .. } | Self::Rebuilt { .. } | Self::Updated { .. }
        )
    }
}

/// How a drained watcher path is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Dirty,
    Clean,
    /// The backend's working-copy state file changed
    MetadataFile,
    /// Something else inside the metadata directory
    Metadata,
}

/// Metadata locations of one root
struct MetadataPaths {
    dir: PathKey,
    file: PathKey,
}

impl StatusRepository {
    /// Run one tick at the current instant
    pub fn tick(&self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    /// Run one tick as if the current instant were `now`
    pub fn tick_at(&self, now: Instant) -> TickOutcome {
        let _tick = self.tick_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let commands = self.commands.dump_commands();
        if !commands.is_empty() {
            return self.run_commands(commands);
        }

        if self.is_build_in_progress() {
            return TickOutcome::Suspended;
        }

        let changed = self.watchers.number_of_changed_files();
        if let Some(latest) = self.watchers.latest_change() {
            let elapsed = now.saturating_duration_since(latest);
            if elapsed < self.config.quiet_period() {
                trace!("{} changes, settling ({:?} since last)", changed, elapsed);
                return TickOutcome::Settling;
            }
        }

        if self.is_rebuild_required() || changed > self.config.rebuild_threshold {
            debug!(
                "Full rebuild (changed: {}, requested: {})",
                changed,
                self.is_rebuild_required()
            );
            let outcome = self.rebuild();
            self.notify_changed();
            return outcome;
        }

        if changed == 0 {
            return TickOutcome::Idle;
        }

        let dirty = self.collect_dirty_files();
        if self.is_rebuild_required() {
            debug!("Metadata change observed, rebuild deferred to next tick");
            return TickOutcome::Deferred;
        }
        if dirty.is_empty() {
            return TickOutcome::Idle;
        }

        debug!("Re-querying {} dirty files", dirty.len());
        let files = {
            let _update = self.begin_update();
            self.refresh_files(&dirty)
        };
        self.notify_changed();
        TickOutcome::Updated { files }
    }

    fn run_commands(&self, commands: Vec<PendingCommand>) -> TickOutcome {
        let executed = commands.len();
        let mut dirty = Vec::new();
        for command in commands {
            command.run(self, &mut dirty);
        }

        let mut seen = HashSet::new();
        dirty.retain(|path| seen.insert(PathKey::new(path)));
        let refreshed = self.refresh_files(&dirty);

        self.notify_changed();
        TickOutcome::Commands {
            executed,
            refreshed,
        }
    }

    /// Discard the cache and every pending dirty path, then re-scan every
    /// root, parents first, and swap the result in
    pub(crate) fn rebuild(&self) -> TickOutcome {
        // Cleared first so a metadata change seen mid-rebuild re-arms it.
        // The dirty paths are discarded below, so any self-caused metadata
        // write they held is gone too.
        self.rebuild_required.store(false, Ordering::SeqCst);
        self.expect_metadata_write.store(false, Ordering::SeqCst);
        let _update = self.begin_update();

        self.cache.clear();
        let discarded = self.watchers.dump_dirty_files();
        trace!("Rebuild discards {} dirty paths", discarded.len());

        let roots = self.roots.roots_by_depth();
        let mut records = Vec::new();
        for root in &roots {
            match self.backend.current_branch(root) {
                Ok(branch) => self.roots.set_branch(root, branch),
                Err(e) => warn!("Unable to read branch of {:?}: {}", root, e),
            }
            match self.backend.root_status(root) {
                Ok(status) => records.extend(status),
                Err(e) => warn!("Status query for {:?} failed: {}", root, e),
            }
        }

        let count = records.len();
        self.cache.replace(records);
        info!("Rebuilt status cache: {} roots, {} records", roots.len(), count);
        TickOutcome::Rebuilt {
            roots: roots.len(),
            records: count,
        }
    }

    /// Drain the watchers and keep the paths whose status must be re-queried.
    /// Stops early once a rebuild has been requested.
    fn collect_dirty_files(&self) -> Vec<PathBuf> {
        let metadata: Vec<MetadataPaths> = self
            .roots
            .roots_by_depth()
            .iter()
            .map(|root| {
                let dir = root.join(&self.config.metadata_dir);
                MetadataPaths {
                    file: PathKey::new(dir.join(&self.config.metadata_file)),
                    dir: PathKey::new(dir),
                }
            })
            .collect();

        let mut dirty = Vec::new();
        for path in self.watchers.dump_dirty_files() {
            match self.classify(&path, &metadata) {
                Classification::Dirty => dirty.push(path),
                Classification::Clean | Classification::Metadata => {}
                Classification::MetadataFile => self.on_metadata_file_change(&path),
            }
            if self.is_rebuild_required() {
                break;
            }
        }
        dirty
    }

    fn classify(&self, path: &Path, metadata: &[MetadataPaths]) -> Classification {
        if path.is_dir() {
            return Classification::Clean;
        }

        let key = PathKey::new(path);
        for paths in metadata {
            if key == paths.file {
                return Classification::MetadataFile;
            }
            if key.is_under(&paths.dir) {
                return Classification::Metadata;
            }
        }

        match self.cache.try_get(path) {
            Some(record) if !record.has_changed_on_disk() => Classification::Clean,
            _ => Classification::Dirty,
        }
    }

    fn on_metadata_file_change(&self, path: &Path) {
        let self_caused = self.is_updating()
            || self.expect_metadata_write.swap(false, Ordering::SeqCst);
        if self_caused {
            trace!("Ignoring self-caused change to {:?}", path);
        } else {
            info!("External change to {:?}, rebuild required", path);
            self.rebuild_required.store(true, Ordering::SeqCst);
        }
    }
}
