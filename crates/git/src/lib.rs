#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Git status backend
//!
//! Implements [`vcstatus_core::StatusBackend`] on top of libgit2. Root scans
//! use `git status` semantics (untracked, unmodified and optionally ignored
//! files included); mutations stage through the index and report the
//! refreshed status of the paths they touched.

mod backend;
mod status_map;

pub use backend::GitBackend;
pub use status_map::map_status;
