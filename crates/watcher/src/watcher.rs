//! Per-root directory watcher
//!
//! A [`DirectoryWatcher`] subscribes to one repository root through the
//! notify crate and passively accumulates the paths it hears about. Nothing
//! is pushed downstream: the reconciliation loop polls the counters and
//! drains the dirty set when it decides to act.

use crate::events::WatchEventKind;
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, trace, warn};
use vcstatus_core::config::WatcherConfig;
use vcstatus_core::error::{Error, Result};
use vcstatus_core::path::PathKey;

/// Accumulated state between two drains
#[derive(Debug, Default)]
struct WatchState {
    /// Dirty paths, collapsed case-insensitively; first spelling wins
    dirty: HashMap<PathKey, PathBuf>,
    /// Raw events received since the last drain
    event_count: usize,
    /// When the most recent event arrived
    latest_change: Option<Instant>,
}

impl WatchState {
    fn record(&mut self, path: PathBuf, at: Instant) {
        self.dirty.entry(PathKey::new(&path)).or_insert(path);
        self.event_count += 1;
        self.latest_change = Some(match self.latest_change {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
}

fn lock(state: &Mutex<WatchState>) -> MutexGuard<'_, WatchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches one root directory tree and accumulates dirty paths
pub struct DirectoryWatcher {
    /// Root directory being watched
    root: PathBuf,
    /// Dirty set and counters, shared with the notify callback
    state: Arc<Mutex<WatchState>>,
    /// Event delivery switch, shared with the notify callback
    enabled: Arc<AtomicBool>,
    /// Active notify subscription; `None` for passive watchers
    watcher: Option<RecommendedWatcher>,
}

impl DirectoryWatcher {
    /// Create a watcher that only accumulates events fed to it through
    /// [`DirectoryWatcher::record`]
    pub fn passive(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Arc::new(Mutex::new(WatchState::default())),
            enabled: Arc::new(AtomicBool::new(true)),
            watcher: None,
        }
    }

    /// Create a watcher subscribed to the root's subtree
    pub fn watch(root: impl Into<PathBuf>, config: &WatcherConfig) -> Result<Self> {
        let mut directory_watcher = Self::passive(root);
        directory_watcher.enabled.store(config.enabled, Ordering::SeqCst);

        let notify_config = NotifyConfig::default()
            .with_poll_interval(config.poll_interval())
            .with_compare_contents(false);

        let state = Arc::clone(&directory_watcher.state);
        let enabled = Arc::clone(&directory_watcher.enabled);
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    if !enabled.load(Ordering::SeqCst) {
                        return;
                    }
                    let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
                        return;
                    };
                    let now = Instant::now();
                    let mut state = lock(&state);
                    for path in event.paths {
                        trace!("{} {:?}", kind, path);
                        state.record(path, now);
                    }
                }
                Err(e) => {
                    warn!("Notify error: {}", e);
                }
            },
            notify_config,
        )
        .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))?;

        watcher
            .watch(&directory_watcher.root, RecursiveMode::Recursive)
            .map_err(|e| {
                Error::watcher(format!(
                    "Failed to watch path {:?}: {e}",
                    directory_watcher.root
                ))
            })?;

        info!("Watching path: {:?}", directory_watcher.root);
        directory_watcher.watcher = Some(watcher);
        Ok(directory_watcher)
    }

    /// Root directory of this watcher
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether an OS-level subscription backs this watcher
    pub fn is_subscribed(&self) -> bool {
        self.watcher.is_some()
    }

    /// Record one raw change event at the current instant
    pub fn record(&self, path: impl Into<PathBuf>, kind: WatchEventKind) {
        self.record_at(path, kind, Instant::now());
    }

    /// Record one raw change event observed at `at`
    pub fn record_at(&self, path: impl Into<PathBuf>, kind: WatchEventKind, at: Instant) {
        if !self.is_enabled() {
            return;
        }
        let path = path.into();
        trace!("{} {:?}", kind, path);
        lock(&self.state).record(path, at);
    }

    /// Raw events received since the last drain
    pub fn changed_count(&self) -> usize {
        lock(&self.state).event_count
    }

    /// Arrival time of the most recent event, if any arrived since the last drain
    pub fn latest_change(&self) -> Option<Instant> {
        lock(&self.state).latest_change
    }

    /// Take the accumulated dirty paths and reset the watcher in the same
    /// critical section
    pub fn dump_dirty_files(&self) -> Vec<PathBuf> {
        let drained = std::mem::take(&mut *lock(&self.state));
        if drained.event_count > 0 {
            debug!(
                "Drained {} dirty paths ({} events) from {:?}",
                drained.dirty.len(),
                drained.event_count,
                self.root
            );
        }
        drained.dirty.into_values().collect()
    }

    /// Suspend or resume event delivery without dropping the subscription
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Drop the OS subscription; accumulated state is kept until drained
    pub fn unsubscribe(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.root) {
                debug!("Failed to unwatch {:?}: {}", self.root, e);
            }
            info!("Stopped watching path: {:?}", self.root);
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
