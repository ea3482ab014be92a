//! Bounded worker pool
//!
//! Runs a group of independent jobs on at most `workers` tokio tasks. After
//! the first failure no further job is handed out; jobs already running are
//! allowed to finish and the first error is returned.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::BuildError;

/// Fixed-size pool of async workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Pool with `workers` workers (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `job` for every item and wait for all started jobs to finish
    ///
    /// Items are dispatched in order. Returns `Ok(())` when every job
    /// succeeded, otherwise the first error observed.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, job: F) -> Result<(), BuildError>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BuildError>> + Send + 'static,
    {
        if items.is_empty() {
            return Ok(());
        }

        let workers = self.workers.min(items.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let errors: Arc<Mutex<Vec<BuildError>>> = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();
        let job = Arc::new(job);

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let errors = Arc::clone(&errors);
            let cancel = cancel.clone();
            let job = Arc::clone(&job);

            tasks.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(item) = queue.lock().await.pop_front() else {
                        break;
                    };
                    if let Err(e) = job(item).await {
                        tracing::debug!(worker, error = %e, "job failed, stopping dispatch");
                        errors.lock().await.push(e);
                        cancel.cancel();
                        break;
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                errors.lock().await.push(BuildError::WorkerAborted {
                    error: e.to_string(),
                });
                cancel.cancel();
            }
        }

        let mut errors = errors.lock().await;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }
}
