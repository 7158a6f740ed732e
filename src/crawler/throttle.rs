//! Per-host download admission
//!
//! Each host gets its own semaphore, created on first reference. A throttle
//! lives for exactly one layer: the scheduler builds a fresh one per layer and
//! drops it once the layer has drained.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds concurrent downloads per host within one layer
#[derive(Debug)]
pub struct HostThrottle {
    /// Slots per host; `None` admits without waiting
    limit: Option<usize>,

    /// Lazily created gates keyed by host name
    slots: DashMap<String, Arc<Semaphore>>,
}

/// A held download slot for one host
///
/// Dropping the slot releases it, so it is returned on success, failure and
/// cancellation alike.
#[derive(Debug)]
pub struct HostSlot {
    host: String,
    _permit: Option<OwnedSemaphorePermit>,
}

impl HostSlot {
    /// The host this slot belongs to
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl HostThrottle {
    /// Creates a throttle admitting at most `limit` concurrent downloads per host
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            slots: DashMap::new(),
        }
    }

    /// Waits until a slot for `host` is free and takes it
    ///
    /// The map shard lock is only held while looking up the semaphore, never
    /// across the wait.
    pub async fn acquire(&self, host: &str) -> HostSlot {
        let Some(limit) = self.limit else {
            return HostSlot {
                host: host.to_string(),
                _permit: None,
            };
        };

        let semaphore = self
            .slots
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(limit)))
            .clone();

        tracing::trace!("Waiting for a slot on {}", host);

        // The semaphore is never closed, so acquisition only fails if that changes
        let permit = semaphore.acquire_owned().await.ok();

        HostSlot {
            host: host.to_string(),
            _permit: permit,
        }
    }

    /// Number of slots currently free for `host`, if it has been seen
    pub fn available(&self, host: &str) -> Option<usize> {
        self.slots.get(host).map(|s| s.available_permits())
    }

    /// Number of hosts referenced so far
    pub fn host_count(&self) -> usize {
        self.slots.len()
    }
}
