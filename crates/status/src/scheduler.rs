//! Periodic driver for reconciliation ticks
//!
//! Ticks call the backend synchronously, so each one runs on the blocking
//! pool. The next period starts only after the previous tick finished.

use crate::repository::StatusRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Spawns the tick loop for a [`StatusRepository`]
pub struct StatusScheduler;

impl StatusScheduler {
    /// Start ticking `repository` every `period` on the current tokio runtime
    pub fn spawn(repository: Arc<StatusRepository>, period: Duration) -> SchedulerHandle {
        let token = CancellationToken::new();
        let cancel_token = token.clone();

        let task = tokio::spawn(async move {
            info!("Status scheduler started ({:?} period)", period);
            loop {
                let repository = Arc::clone(&repository);
                match tokio::task::spawn_blocking(move || repository.tick()).await {
                    Ok(outcome) if outcome.notified() => debug!("Tick: {:?}", outcome),
                    Ok(outcome) => trace!("Tick: {:?}", outcome),
                    Err(e) if e.is_panic() => error!("Status tick panicked: {}", e),
                    Err(e) => {
                        debug!("Status tick cancelled: {}", e);
                        break;
                    }
                }

                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        break;
                    }
                    _ = tokio::time::sleep(period) => {}
                }
            }
            info!("Status scheduler shutting down");
        });

        SchedulerHandle { token, task }
    }
}

/// Owner of a running tick loop
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Token that stops the loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for the in-flight tick to complete
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!("Status scheduler task failed: {}", e);
        }
    }
}
