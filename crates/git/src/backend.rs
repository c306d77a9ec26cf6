//! Git implementation of the status backend
//!
//! Every call discovers and opens the repositories it needs; no
//! `git2::Repository` handle outlives a call, so the backend itself is
//! `Send + Sync` and can be shared with the reconciliation loop.

use crate::status_map::{index_identity, map_status};
use git2::{ErrorCode, Index, Repository, StatusOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vcstatus_core::backend::StatusBackend;
use vcstatus_core::config::StatusConfig;
use vcstatus_core::error::{Error, Result};
use vcstatus_core::path::normalize_path;
use vcstatus_core::status::{FileIdentity, FileStatus, FileStatusRecord};

/// A repository opened for the duration of one backend call
struct OpenRepository {
    repo: Repository,
    /// Normalised working directory
    workdir: PathBuf,
}

impl OpenRepository {
    /// Open the innermost repository enclosing `path`. The path itself does
    /// not need to exist; discovery starts at its nearest existing ancestor.
    fn discover(path: &Path) -> Result<Self> {
        let start = existing_ancestor(path)
            .ok_or_else(|| Error::backend(format!("No existing ancestor for {path:?}")))?;
        let repo = Repository::discover(&start)
            .map_err(|e| Error::backend(format!("Failed to open Git repository: {e}")))?;
        let workdir = repo
            .workdir()
            .map(normalize_path)
            .ok_or_else(|| Error::backend("Repository has no working directory"))?;
        Ok(Self { repo, workdir })
    }

    fn index(&self) -> Result<Index> {
        self.repo
            .index()
            .map_err(|e| Error::backend(format!("Failed to read index: {e}")))
    }

    fn relative(&self, path: &Path) -> Result<PathBuf> {
        normalize_path(path)
            .strip_prefix(&self.workdir)
            .map(Path::to_path_buf)
            .map_err(|_| Error::backend(format!("{path:?} is outside {:?}", self.workdir)))
    }

    /// Query the status of one file, attaching its identity from disk or,
    /// for a file that is gone, from the index
    fn record(&self, path: &Path, index: Option<&Index>) -> Result<FileStatusRecord> {
        let relative = self.relative(path)?;
        let status = match self.repo.status_file(&relative) {
            Ok(status) => map_status(status),
            Err(e) if e.code() == ErrorCode::NotFound => FileStatus::Unknown,
            Err(e) => {
                return Err(Error::backend(format!(
                    "Failed to get status of {path:?}: {e}"
                )))
            }
        };

        let identity = FileIdentity::from_disk(path).or_else(|| {
            index
                .and_then(|index| index.get_path(&relative, 0))
                .map(|entry| index_identity(&entry))
        });

        let record = FileStatusRecord::new(path, status);
        Ok(match identity {
            Some(identity) => record.with_identity(identity),
            None => record,
        })
    }
}

fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| candidate.is_dir())
        .map(Path::to_path_buf)
}

/// Group paths by the repository that contains them, preserving the
/// caller's order within each repository
fn group_by_repository(paths: &[PathBuf]) -> Vec<(OpenRepository, Vec<PathBuf>)> {
    let mut groups: Vec<(OpenRepository, Vec<PathBuf>)> = Vec::new();
    let mut positions: HashMap<PathBuf, usize> = HashMap::new();

    for path in paths {
        let repository = match OpenRepository::discover(path) {
            Ok(repository) => repository,
            Err(e) => {
                debug!("Skipping {:?}: {}", path, e);
                continue;
            }
        };
        match positions.get(&repository.workdir) {
            Some(&position) => groups[position].1.push(path.clone()),
            None => {
                positions.insert(repository.workdir.clone(), groups.len());
                groups.push((repository, vec![path.clone()]));
            }
        }
    }

    groups
}

/// [`StatusBackend`] over libgit2
#[derive(Debug, Clone)]
pub struct GitBackend {
    include_ignored: bool,
}

impl GitBackend {
    pub fn new(include_ignored: bool) -> Self {
        Self { include_ignored }
    }

    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new(config.include_ignored)
    }

    /// Apply an index mutation to every path, write each touched index once
    /// and report the refreshed status of the paths
    fn stage<F>(
        &self,
        paths: &[PathBuf],
        operation: &str,
        mut apply: F,
    ) -> Result<Vec<FileStatusRecord>>
    where
        F: FnMut(&mut Index, &Path) -> std::result::Result<(), git2::Error>,
    {
        let mut records = Vec::with_capacity(paths.len());
        for (repository, group) in group_by_repository(paths) {
            let mut index = repository.index()?;
            for path in &group {
                let relative = repository.relative(path)?;
                apply(&mut index, &relative)
                    .map_err(|e| Error::backend(format!("Failed to {operation} {path:?}: {e}")))?;
            }
            index
                .write()
                .map_err(|e| Error::backend(format!("Failed to write index: {e}")))?;
            debug!("{} {} files in {:?}", operation, group.len(), repository.workdir);

            for path in &group {
                records.push(repository.record(path, Some(&index))?);
            }
        }
        Ok(records)
    }
}

impl Default for GitBackend {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StatusBackend for GitBackend {
    fn root_status(&self, root: &Path) -> Result<Vec<FileStatusRecord>> {
        let repository = OpenRepository::discover(root)?;
        let index = repository.index()?;

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_unmodified(true)
            .include_ignored(self.include_ignored)
            .recurse_ignored_dirs(false)
            .exclude_submodules(true);

        let statuses = repository
            .repo
            .statuses(Some(&mut options))
            .map_err(|e| Error::backend(format!("Failed to get status: {e}")))?;

        let mut records = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let Some(relative) = entry.path() else {
                warn!("Skipping status entry with non UTF-8 path in {:?}", root);
                continue;
            };
            // Untracked and ignored directories are reported as a single
            // entry with a trailing slash
            if relative.ends_with('/') {
                continue;
            }

            let path = repository.workdir.join(relative);
            let identity = FileIdentity::from_disk(&path).or_else(|| {
                index
                    .get_path(Path::new(relative), 0)
                    .map(|entry| index_identity(&entry))
            });
            let record = FileStatusRecord::new(path, map_status(entry.status()));
            records.push(match identity {
                Some(identity) => record.with_identity(identity),
                None => record,
            });
        }

        info!(
            "Scanned {:?}: {} status entries",
            repository.workdir,
            records.len()
        );
        Ok(records)
    }

    fn file_status(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        let mut records = Vec::with_capacity(paths.len());
        for (repository, group) in group_by_repository(paths) {
            let index = repository.index()?;
            for path in group {
                if path.is_dir() {
                    continue;
                }
                records.push(repository.record(&path, Some(&index))?);
            }
        }
        Ok(records)
    }

    fn add_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        self.stage(paths, "add", |index, relative| index.add_path(relative))
    }

    fn remove_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        self.stage(paths, "remove", |index, relative| index.remove_path(relative))
    }

    fn rename_files(&self, from: &[PathBuf], to: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        if from.len() != to.len() {
            return Err(Error::invalid_input(format!(
                "Rename needs one destination per source ({} sources, {} destinations)",
                from.len(),
                to.len()
            )));
        }

        let mut records = self.stage(from, "remove", |index, relative| {
            index.remove_path(relative)
        })?;
        records.extend(self.stage(to, "add", |index, relative| index.add_path(relative))?);
        Ok(records)
    }

    fn current_branch(&self, root: &Path) -> Result<String> {
        let repository = OpenRepository::discover(root)?;
        let head = match repository.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // No commits yet: HEAD is a symbolic ref to a branch that
                // does not exist
                let head = repository
                    .repo
                    .find_reference("HEAD")
                    .map_err(|e| Error::backend(format!("Failed to read HEAD: {e}")))?;
                return head
                    .symbolic_target()
                    .map(|target| target.trim_start_matches("refs/heads/").to_string())
                    .ok_or_else(|| Error::backend("HEAD is not a symbolic reference"));
            }
            Err(e) => return Err(Error::backend(format!("Failed to get HEAD: {e}"))),
        };

        if head.is_branch() {
            head.shorthand()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::backend("Branch name is not UTF-8"))
        } else {
            let oid = head
                .target()
                .ok_or_else(|| Error::backend("HEAD has no target (empty repository?)"))?;
            Ok(format!("detached:{}", &oid.to_string()[..8]))
        }
    }

    fn find_repository_root(&self, path: &Path) -> Option<PathBuf> {
        match OpenRepository::discover(path) {
            Ok(repository) => Some(repository.workdir),
            Err(e) => {
                debug!("No repository for {:?}: {}", path, e);
                None
            }
        }
    }
}
