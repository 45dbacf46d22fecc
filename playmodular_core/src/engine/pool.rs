use crate::engine::error::{ConfigError, SearchError};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Fixed-size worker pool with a join-all barrier.
///
/// Every batch blocks the caller until all of its tasks have finished.
/// Results come back in submission order; a task that panics yields
/// `SearchError::TaskPanicked` in its slot instead of taking the batch down.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ConfigError> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("search-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, threads })
    }

    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Rebuilds the pool when the size changes. Returns whether it did.
    pub fn resize(&mut self, threads: usize) -> Result<bool, ConfigError> {
        if threads.max(1) == self.threads {
            return Ok(false);
        }
        *self = Self::new(threads)?;
        log::debug!("worker pool rebuilt with {} threads", self.threads);
        Ok(true)
    }

    /// Runs one-off tasks, one per element.
    pub fn run_all<T, F>(&self, tasks: Vec<F>) -> Vec<Result<T, SearchError>>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| catch_unwind(AssertUnwindSafe(task)).map_err(panic_error))
                .collect()
        })
    }

    /// Runs `task(0)` through `task(count - 1)`.
    pub fn run_each<T, F>(&self, count: usize, task: F) -> Vec<Result<T, SearchError>>
    where
        F: Fn(usize) -> T + Sync,
        T: Send,
    {
        self.pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|i| catch_unwind(AssertUnwindSafe(|| task(i))).map_err(panic_error))
                .collect()
        })
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> SearchError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    SearchError::TaskPanicked(message)
}
