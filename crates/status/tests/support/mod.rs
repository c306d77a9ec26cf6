//! In-memory backend for reconciliation tests

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};
use vcstatus::StatusRepository;
use vcstatus_core::config::{StatusConfig, WatcherConfig};
use vcstatus_core::error::{Error, Result};
use vcstatus_core::path::PathKey;
use vcstatus_core::status::{FileIdentity, FileStatus, FileStatusRecord};
use vcstatus_core::StatusBackend;
use vcstatus_watcher::DirectoryWatcherSet;

/// One backend invocation, as observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RootStatus(PathBuf),
    FileStatus(Vec<PathBuf>),
    Add(Vec<PathBuf>),
    Remove(Vec<PathBuf>),
    Rename(Vec<PathBuf>, Vec<PathBuf>),
    Branch(PathBuf),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Add(_) | Call::Remove(_) | Call::Rename(..))
    }
}

#[derive(Default)]
struct FakeState {
    roots: Vec<PathBuf>,
    branches: HashMap<PathBuf, String>,
    files: HashMap<PathKey, FileStatusRecord>,
    calls: Vec<Call>,
    failing: bool,
}

impl FakeState {
    fn innermost_root(&self, path: &Path) -> Option<PathBuf> {
        let key = PathKey::new(path);
        self.roots
            .iter()
            .filter(|root| key.is_under(&PathKey::new(root)))
            .max_by_key(|root| root.as_os_str().len())
            .cloned()
    }

    fn record(&self, path: &Path) -> FileStatusRecord {
        self.files
            .get(&PathKey::new(path))
            .cloned()
            .unwrap_or_else(|| FileStatusRecord::new(path, FileStatus::Unknown))
    }

    fn set_status(&mut self, path: &Path, status: FileStatus) -> FileStatusRecord {
        let key = PathKey::new(path);
        let mut record = self.record(path);
        record.status = status;
        self.files.insert(key, record.clone());
        record
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            Err(Error::backend("backend offline"))
        } else {
            Ok(())
        }
    }
}

/// Status backend that serves records from memory and logs every call
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_root(&self, root: impl Into<PathBuf>, branch: &str) {
        let root = root.into();
        let mut state = self.state.lock().unwrap();
        state.branches.insert(root.clone(), branch.to_string());
        state.roots.push(root);
    }

    pub fn set_branch(&self, root: &Path, branch: &str) {
        let mut state = self.state.lock().unwrap();
        state.branches.insert(root.to_path_buf(), branch.to_string());
    }

    pub fn set_file(&self, record: FileStatusRecord) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(PathKey::new(&record.path), record);
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }
}

impl StatusBackend for FakeBackend {
    fn root_status(&self, root: &Path) -> Result<Vec<FileStatusRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::RootStatus(root.to_path_buf()));
        state.check()?;
        let mut records: Vec<FileStatusRecord> = state
            .files
            .values()
            .filter(|record| state.innermost_root(&record.path).as_deref() == Some(root))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    fn file_status(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FileStatus(paths.to_vec()));
        state.check()?;
        Ok(paths.iter().map(|path| state.record(path)).collect())
    }

    fn add_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Add(paths.to_vec()));
        state.check()?;
        Ok(paths
            .iter()
            .map(|path| state.set_status(path, FileStatus::Added))
            .collect())
    }

    fn remove_files(&self, paths: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Remove(paths.to_vec()));
        state.check()?;
        Ok(paths
            .iter()
            .map(|path| state.set_status(path, FileStatus::Removed))
            .collect())
    }

    fn rename_files(&self, from: &[PathBuf], to: &[PathBuf]) -> Result<Vec<FileStatusRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Rename(from.to_vec(), to.to_vec()));
        state.check()?;
        let mut records = Vec::new();
        for (old, new) in from.iter().zip(to) {
            records.push(state.set_status(old, FileStatus::Removed));
            records.push(state.set_status(new, FileStatus::Renamed));
        }
        Ok(records)
    }

    fn current_branch(&self, root: &Path) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Branch(root.to_path_buf()));
        state.check()?;
        Ok(state
            .branches
            .get(root)
            .cloned()
            .unwrap_or_else(|| "main".to_string()))
    }

    fn find_repository_root(&self, path: &Path) -> Option<PathBuf> {
        self.state.lock().unwrap().innermost_root(path)
    }
}

/// A record with a fixed, synthetic identity
pub fn record(path: impl Into<PathBuf>, status: FileStatus) -> FileStatusRecord {
    FileStatusRecord::new(path, status).with_identity(identity(1_700_000_000, 64))
}

pub fn identity(secs: u64, length: u64) -> FileIdentity {
    FileIdentity::new(Some(UNIX_EPOCH + Duration::from_secs(secs)), length)
}

/// Repository over `backend` with default thresholds
pub fn repository(backend: &Arc<FakeBackend>) -> StatusRepository {
    repository_with(backend, StatusConfig::default())
}

pub fn repository_with(backend: &Arc<FakeBackend>, config: StatusConfig) -> StatusRepository {
    let backend: Arc<dyn StatusBackend> = backend.clone();
    StatusRepository::with_watchers(
        backend,
        config,
        DirectoryWatcherSet::new(WatcherConfig::default()),
    )
}
