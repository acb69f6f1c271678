//! Bounded CPU pool for preprocessing, training and scoring.
//!
//! Jobs run on a dedicated rayon pool so they never block the async
//! runtime; results come back to the awaiting caller over a oneshot channel.

use std::panic::{self, AssertUnwindSafe};

use fraudlens_core::DetectError;
use tokio::sync::oneshot;
use tracing::{error, info};

pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Result<Self, DetectError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("fraudlens-worker-{i}"))
            .build()
            .map_err(|e| DetectError::WorkerPool(format!("failed to build thread pool: {e}")))?;
        info!("Worker pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool and await its result. A job that panics is
    /// reported as [`DetectError::WorkerPool`].
    pub async fn run<F, T>(&self, job: F) -> Result<T, DetectError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job));
            if outcome.is_err() {
                error!("Worker job panicked");
            }
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(DetectError::WorkerPool("job panicked".to_string())),
            Err(_) => Err(DetectError::WorkerPool(
                "job dropped before completing".to_string(),
            )),
        }
    }
}
