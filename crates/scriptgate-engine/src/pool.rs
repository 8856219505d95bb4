//! Process-concurrency limiter.
//!
//! One pool per evaluator: a counting semaphore sized by
//! `max_concurrent_processes`. A slot is held for the whole life of a child
//! process. Pools are owned values, so two evaluators never share a limit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;

use scriptgate_core::error::{Result, ScriptGateError};

#[derive(Debug, Clone)]
pub struct ProcessPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
}

/// Held while a child process may be running. Released on drop.
#[derive(Debug)]
pub struct ProcessSlot {
    _permit: OwnedSemaphorePermit,
}

impl ProcessPool {
    pub fn new(capacity: usize, queue_timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
        }
    }

    /// Wait up to `queue_timeout` for a free slot.
    pub async fn acquire(&self) -> Result<ProcessSlot> {
        match timeout(self.queue_timeout, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(ProcessSlot { _permit: permit }),
            Ok(Err(_)) => Err(ScriptGateError::Internal("process pool closed".into())),
            Err(_) => Err(ScriptGateError::Saturated {
                waited_ms: self.queue_timeout.as_millis() as u64,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
