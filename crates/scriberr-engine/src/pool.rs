//! Job-level worker pool (§5): parallel across jobs, single-worker within
//! one job. A `tokio::sync::Semaphore` bounds how many jobs run at once;
//! within a job, the processor itself never spawns concurrent work.

use std::sync::Arc;

use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Run `job` once a slot is free. The permit is held for the duration of
    /// `job` and released on every exit path, including panics, since it is
    /// owned by the guard returned from `acquire`.
    pub async fn run<F, Fut, T>(&self, job: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore is never closed");
        job().await
    }
}
