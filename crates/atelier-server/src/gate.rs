//! Concurrency gate bounding simultaneous in-flight model calls.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// FIFO counting semaphore around the remote model. At most `max` calls are
/// in flight; excess acquirers queue in arrival order. The gate never times
/// out on its own; callers race the whole guarded operation against their
/// deadline.
#[derive(Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl Gate {
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// Wait for a slot. The returned permit releases its slot on drop, so
    /// release happens on success, error, and timeout paths alike.
    pub async fn acquire(&self) -> GatePermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore closed");
        GatePermit { _permit: permit }
    }

    /// Calls currently holding a slot.
    pub fn active(&self) -> usize {
        self.max - self.semaphore.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// A held gate slot. Dropping it hands the slot to the longest-waiting
/// pending acquirer.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
