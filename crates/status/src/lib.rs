#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Live version-control status cache
//!
//! [`StatusRepository`] keeps the status of every file under its registered
//! roots current without re-scanning on every change:
//!
//! - **Cache**: path-keyed status records with on-disk identity
//! - **Roots**: registered repository roots and their branch
//! - **Watchers**: filesystem notifications accumulated per root
//! - **Commands**: caller intents executed on the next tick
//! - **Reconciliation**: a periodic tick that debounces, batches and decides
//!   between per-file queries and a full rebuild
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vcstatus::{StatusRepository, StatusScheduler};
//! use vcstatus_core::{Config, StatusBackend};
//!
//! # async fn run(backend: Arc<dyn StatusBackend>) {
//! let config = Config::default();
//! let repository = Arc::new(StatusRepository::new(backend, &config));
//! repository.add_root_directory(Path::new("/path/to/repo"));
//!
//! let scheduler = StatusScheduler::spawn(Arc::clone(&repository), config.status.tick_interval());
//! let mut changes = repository.subscribe();
//! while changes.recv().await.is_ok() {
//!     for record in repository.pending_files() {
//!         println!("{} {}", record.status.code(), record.path.display());
//!     }
//! }
//! scheduler.shutdown().await;
//! # }
//! ```

mod cache;
mod commands;
mod reconcile;
mod repository;
mod roots;
mod scheduler;

pub use cache::StatusCache;
pub use commands::{CommandQueue, PendingCommand};
pub use reconcile::TickOutcome;
pub use repository::{StatusChanged, StatusRepository, UpdateGuard};
pub use roots::RootRegistry;
pub use scheduler::{SchedulerHandle, StatusScheduler};
