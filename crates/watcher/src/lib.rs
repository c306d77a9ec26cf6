#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Directory watching for live status reconciliation
//!
//! This crate turns raw filesystem notifications into a pollable signal:
//! - One recursive watcher per repository root
//! - Dirty paths accumulated with duplicates collapsed
//! - Event counts and newest-event time for debounce decisions
//! - An atomic drain-and-reset
//! - A suspend switch that keeps registrations alive
//!
//! # Example
//!
//! ```no_run
//! use vcstatus_watcher::DirectoryWatcherSet;
//! use std::path::Path;
//!
//! let watchers = DirectoryWatcherSet::default();
//! watchers.watch_directory(Path::new("/path/to/repo"));
//!
//! if watchers.number_of_changed_files() > 0 {
//!     for path in watchers.dump_dirty_files() {
//!         println!("changed: {}", path.display());
//!     }
//! }
//! ```

mod events;
mod watcher;
mod watcher_set;

pub use events::WatchEventKind;
pub use watcher::DirectoryWatcher;
pub use watcher_set::DirectoryWatcherSet;
