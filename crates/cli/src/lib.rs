//! Library interface for the vcstatus CLI
//!
//! Keeps repository setup and output rendering out of main.rs so they can be
//! exercised by integration tests.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod output;

pub use anyhow::Result;
pub use vcstatus_core::config::Config;

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use vcstatus::StatusRepository;
use vcstatus_core::StatusBackend;
use vcstatus_git::GitBackend;

/// Build a git-backed repository and register the roots enclosing `paths`.
///
/// Paths outside any repository are reported and skipped; it is an error
/// when none of them lies inside one.
pub fn open_repository(config: &Config, paths: &[PathBuf]) -> Result<Arc<StatusRepository>> {
    let backend: Arc<dyn StatusBackend> = Arc::new(GitBackend::from_config(&config.status));
    let repository = Arc::new(StatusRepository::new(backend, config));

    for path in paths {
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let registered = repository.add_root_directory(&path).is_some();
        if !registered && repository.root_for(&path).is_none() {
            warn!("{} is not inside a repository", path.display());
        }
    }

    if repository.is_empty() {
        bail!("None of the given paths is inside a repository");
    }
    Ok(repository)
}
