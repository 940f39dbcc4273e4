//! Bounded pool for background jobs.
//!
//! Each job holds a semaphore permit for its whole run. Submitting while
//! every permit is taken fails immediately instead of queueing, so background
//! work cannot grow without bound under an admission burst.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::PoolError;

/// A fixed number of concurrent background workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool running at most `capacity` jobs at once (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum concurrent jobs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Workers currently idle.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Saturated`] without running the job when every
    /// worker is busy.
    pub fn submit<F>(&self, job: F) -> Result<JoinHandle<()>, PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| PoolError::Saturated {
                capacity: self.capacity,
            })?;

        Ok(tokio::spawn(async move {
            job.await;
            drop(permit);
        }))
    }
}
