//! Version-control backend seam
//!
//! The reconciliation engine never talks to a repository directly; every
//! query and mutation goes through [`StatusBackend`]. Calls are synchronous
//! and are only issued from a scheduler tick or from a caller's own facade
//! call.

use crate::error::Result;
use crate::status::FileStatusRecord;
use std::path::{Path, PathBuf};

/// Query and mutation layer of a version-control system
///
/// Every method may fail (backend unavailable, path outside a repository).
/// Callers treat a failure as "no status information" for that batch.
pub trait StatusBackend: Send + Sync {
    /// Status of every file beneath a repository root
    fn root_status(&self, root: &Path) -> Result<Vec<FileStatusRecord>>;

    /// Status of an explicit list of files, which may span several roots
    fn file_status(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>>;

    /// Schedule files for addition and report their new status
    fn add_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>>;

    /// Schedule files for removal and report their new status
    fn remove_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>>;

    /// Record renames pairwise (`from[i]` -> `to[i]`) and report the new status
    fn rename_files(&self, from: &[PathBuf], to: &[PathBuf]) -> Result<Vec<FileStatusRecord>>;

    /// Name of the branch currently checked out at `root`
    fn current_branch(&self, root: &Path) -> Result<String>;

    /// Innermost repository root enclosing `path`, if any
    fn find_repository_root(&self, path: &Path) -> Option<PathBuf>;
}
