//! End-of-layer barrier
//!
//! Every unit of layer work holds a [`Ticket`]. A ticket is taken before the
//! work is handed to a stage and released when the work ends, whatever the
//! outcome. [`LayerBarrier::wait`] returns once no tickets are outstanding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    outstanding: AtomicUsize,
    drained: Notify,
}

/// Counts the outstanding work of one layer
#[derive(Debug, Clone, Default)]
pub struct LayerBarrier {
    inner: Arc<Inner>,
}

/// One unit of outstanding work; released on drop
#[derive(Debug)]
pub struct Ticket {
    inner: Arc<Inner>,
}

impl LayerBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more unit of outstanding work
    pub fn ticket(&self) -> Ticket {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        Ticket {
            inner: self.inner.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Waits until every ticket has been released
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            // Register before checking, so a release in between still wakes us
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }
}

impl Clone for Ticket {
    fn clone(&self) -> Self {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}
