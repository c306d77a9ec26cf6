//! Caller intents queued for the next reconciliation tick

use crate::repository::StatusRepository;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// An operation submitted by a caller and executed by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCommand {
    AddFiles(Vec<PathBuf>),
    RemoveFiles(Vec<PathBuf>),
    RenameFiles { from: Vec<PathBuf>, to: Vec<PathBuf> },
    /// Re-query the given files
    RefreshFiles(Vec<PathBuf>),
    /// Re-scan a whole root
    RefreshRoot(PathBuf),
}

impl PendingCommand {
    /// Perform the command's backend side effect and append the paths whose
    /// cached status must be re-queried
    pub(crate) fn run(self, repository: &StatusRepository, dirty: &mut Vec<PathBuf>) {
        debug!("Running {}", self.name());
        match self {
            Self::AddFiles(paths) => dirty.extend(repository.apply_add(&paths)),
            Self::RemoveFiles(paths) => dirty.extend(repository.apply_remove(&paths)),
            Self::RenameFiles { from, to } => match repository.apply_rename(&from, &to) {
                Ok(affected) => dirty.extend(affected),
                Err(e) => warn!("Dropping rename command: {}", e),
            },
            Self::RefreshFiles(paths) => dirty.extend(paths),
            Self::RefreshRoot(root) => repository.update_root_status(&root),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AddFiles(_) => "add",
            Self::RemoveFiles(_) => "remove",
            Self::RenameFiles { .. } => "rename",
            Self::RefreshFiles(_) => "refresh files",
            Self::RefreshRoot(_) => "refresh root",
        }
    }
}

/// FIFO backlog of [`PendingCommand`]s
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Mutex<VecDeque<PendingCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn commands(&self) -> MutexGuard<'_, VecDeque<PendingCommand>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, command: PendingCommand) {
        self.commands().push_back(command);
    }

    /// Take the whole backlog in submission order
    pub fn dump_commands(&self) -> Vec<PendingCommand> {
        std::mem::take(&mut *self.commands()).into()
    }

    pub fn len(&self) -> usize {
        self.commands().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands().is_empty()
    }

    pub fn clear(&self) {
        self.commands().clear();
    }
}
