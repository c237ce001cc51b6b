//! Cancellable delayed task.
//!
//! Scheduling replaces any pending task and restarts the quiet window, so a
//! burst of triggers produces one run after activity stops. Work for an older
//! revision than one already scheduled or run is ignored.
//!
//! Only the quiet window can be cancelled. Once it elapses the job runs on its
//! own task and always completes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Pending {
    handle: Option<JoinHandle<()>>,
    revision: Option<i64>,
}

#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Schedule `job` after the quiet window. Returns false when ignored as stale.
    pub async fn schedule<F, Fut>(&self, revision: i64, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if pending.revision.is_some_and(|latest| revision < latest) {
            tracing::debug!("Ignoring stale push for revision {}", revision);
            return false;
        }

        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }

        let delay = self.delay;
        pending.revision = Some(revision);
        // The handle covers the wait only; the job itself is detached
        pending.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job());
        }));
        true
    }

    /// Drop the pending task if its quiet window has not elapsed yet.
    /// Returns whether one was waiting.
    pub async fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.handle.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }
}
