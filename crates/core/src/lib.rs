#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Core types and traits for the vcstatus system
//!
//! This crate provides the foundational abstractions shared by the watcher,
//! the backends and the reconciliation engine:
//!
//! - **Status model**: per-file status records and on-disk identity
//! - **Path keys**: normalised, case-insensitive cache keys
//! - **Backend trait**: the version-control query/mutation seam
//! - **Configuration**: thresholds, metadata layout and watcher settings
//! - **Error handling**: unified error types

pub mod backend;
pub mod config;
pub mod error;
pub mod path;
pub mod status;

pub use backend::StatusBackend;
pub use config::{Config, StatusConfig, WatcherConfig};
pub use error::{Error, Result, ResultExt};
pub use path::{has_trailing_separator, normalize_path, PathKey};
pub use status::{FileIdentity, FileStatus, FileStatusRecord};
