//! Bounded worker stages
//!
//! A stage runs submitted tasks on the tokio runtime while holding one of its
//! permits, so at most `limit` of its tasks make progress at once. Tasks
//! submitted to a saturated stage wait for a permit; they are never dropped.
//! All stages of a crawler spawn onto one `TaskTracker`, which `close` waits on.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A named, bounded pool of tasks
#[derive(Debug, Clone)]
pub struct Stage {
    name: &'static str,
    permits: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Stage {
    /// Creates a stage running at most `limit` tasks at once (`None` = unbounded)
    pub fn new(
        name: &'static str,
        limit: Option<usize>,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name,
            permits: limit.map(|n| Arc::new(Semaphore::new(n))),
            tracker,
            shutdown,
        }
    }

    /// Free permits, or `None` for an unbounded stage
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|p| p.available_permits())
    }

    /// Returns true once the owning crawler has shut down
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.tracker.is_closed()
    }

    /// Queues `task` to run under one of the stage's permits
    ///
    /// The task is abandoned, never started, if `cancel` fires while it waits
    /// for a permit. Returns false without spawning anything once the stage
    /// is closed; `task` is dropped in that case.
    pub fn submit<F>(&self, cancel: CancellationToken, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            tracing::debug!("{} stage is closed, rejecting task", self.name);
            return false;
        }

        let permits = self.permits.clone();
        let name = self.name;

        self.tracker.spawn(async move {
            let _permit = match permits {
                Some(permits) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::trace!("{} task cancelled while queued", name);
                            return;
                        }
                        permit = permits.acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => return,
                        },
                    }
                }
                None => None,
            };

            task.await;
        });

        true
    }
}
