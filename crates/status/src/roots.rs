//! Registry of repository roots and their checked-out branch

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use vcstatus_core::path::PathKey;

#[derive(Debug, Clone)]
struct RootEntry {
    path: PathBuf,
    branch: String,
}

/// Repository roots, each registered at most once
#[derive(Debug, Default)]
pub struct RootRegistry {
    roots: DashMap<PathKey, RootEntry>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root with its branch. Returns false if the root was
    /// already registered; the existing entry is left untouched.
    pub fn register(&self, root: &Path, branch: impl Into<String>) -> bool {
        match self.roots.entry(PathKey::new(root)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(RootEntry {
                    path: root.to_path_buf(),
                    branch: branch.into(),
                });
                true
            }
        }
    }

    pub fn contains(&self, root: &Path) -> bool {
        self.roots.contains_key(&PathKey::new(root))
    }

    /// Record a freshly queried branch for an already registered root
    pub fn set_branch(&self, root: &Path, branch: impl Into<String>) {
        if let Some(mut entry) = self.roots.get_mut(&PathKey::new(root)) {
            entry.branch = branch.into();
        }
    }

    pub fn branch(&self, root: &Path) -> Option<String> {
        self.roots
            .get(&PathKey::new(root))
            .map(|entry| entry.branch.clone())
    }

    /// Distinct non-empty branch names, sorted
    pub fn branch_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .roots
            .iter()
            .map(|entry| entry.branch.clone())
            .filter(|branch| !branch.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Registered roots, parents before nested sub-roots
    pub fn roots_by_depth(&self) -> Vec<PathBuf> {
        let mut roots: Vec<(usize, PathBuf)> = self
            .roots
            .iter()
            .map(|entry| (entry.key().len(), entry.path.clone()))
            .collect();
        roots.sort();
        roots.into_iter().map(|(_, path)| path).collect()
    }

    /// Innermost registered root containing `path`
    pub fn root_for(&self, path: &Path) -> Option<PathBuf> {
        let key = PathKey::new(path);
        self.roots
            .iter()
            .filter(|entry| key.is_under(entry.key()))
            .max_by_key(|entry| entry.key().len())
            .map(|entry| entry.path.clone())
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn clear(&self) {
        self.roots.clear();
    }
}
