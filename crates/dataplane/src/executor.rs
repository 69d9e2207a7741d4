//! Bounded worker pool for blocking model calls
//!
//! A fixed set of OS threads consumes jobs from a bounded queue. The async
//! scheduler submits a blocking call together with a oneshot completion
//! channel and suspends the serving task until the pool signals completion,
//! so request decode/encode work never stalls behind model execution. When
//! the queue is full, submissions fail fast with `ServerBusy` instead of
//! growing without bound.

use crossbeam::channel::{self, TrySendError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use common::error::{Error, Result};

/// A unit of blocking work
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of OS threads executing blocking model calls
pub struct WorkerPool {
    /// Job submission side of the bounded queue; `None` once shut down
    job_tx: Mutex<Option<channel::Sender<Job>>>,

    /// Worker thread handles, joined on shutdown
    workers: Mutex<Vec<std::thread::JoinHandle<()>>>,

    /// Number of worker threads
    size: usize,
}

impl WorkerPool {
    /// Creates a pool with `size` worker threads and a queue holding at most
    /// `queue_depth` pending jobs
    pub fn new(size: usize, queue_depth: usize) -> Result<Self> {
        let size = size.max(1);
        let (job_tx, job_rx) = channel::bounded::<Job>(queue_depth.max(1));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let rx = job_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("model-worker-{}", index))
                .spawn(move || {
                    for job in rx.iter() {
                        job();
                    }
                    debug!("Worker thread exiting");
                })?;
            workers.push(handle);
        }

        info!("Worker pool started with {} threads", size);

        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            size,
        })
    }

    /// Creates a pool sized from available parallelism
    pub fn with_default_size(queue_depth: usize) -> Result<Self> {
        Self::new(num_cpus::get(), queue_depth)
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.size
    }

    /// Submits a blocking call and suspends until it completes. Fails with
    /// `ServerBusy` when the queue is saturated. If the caller stops
    /// waiting (e.g. on timeout), the job still runs to completion on its
    /// worker thread and its result is discarded.
    pub async fn submit<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            let _ = result_tx.send(f());
        });

        let sender = self
            .job_tx
            .lock()
            .clone()
            .ok_or_else(|| Error::Internal("Worker pool is shut down".to_string()))?;

        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Worker pool queue is saturated, rejecting submission");
                return Err(Error::ServerBusy("Worker pool queue is full".to_string()));
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(Error::Internal("Worker pool is shut down".to_string()));
            }
        }

        result_rx
            .await
            .map_err(|_| Error::Internal("Worker dropped the result channel".to_string()))
    }

    /// Shuts the pool down: stops accepting jobs, drains the queue, and
    /// joins the worker threads
    pub fn shutdown(&self) {
        if self.job_tx.lock().take().is_none() {
            return;
        }

        info!("Shutting down worker pool");

        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_result() {
        let pool = WorkerPool::new(2, 8).unwrap();
        let result = pool.submit(|| 21 * 2).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_jobs_run_in_parallel_with_async_work() {
        let pool = Arc::new(WorkerPool::new(2, 8).unwrap());

        let blocking = {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.submit(|| {
                    std::thread::sleep(Duration::from_millis(100));
                    "done"
                })
                .await
            })
        };

        // The async scheduler stays responsive while the pool blocks
        let async_result =
            tokio::time::timeout(Duration::from_millis(50), async { 1 + 1 }).await;
        assert!(async_result.is_ok());

        assert_eq!(blocking.await.unwrap().unwrap(), "done");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_saturation_returns_server_busy() {
        // One worker, one queue slot: the second long job occupies the
        // queue while the first occupies the worker.
        let pool = Arc::new(WorkerPool::new(1, 1).unwrap());
        let release = Arc::new(AtomicUsize::new(0));

        let mut blocked = Vec::new();
        for _ in 0..2 {
            let pool = pool.clone();
            let release = release.clone();
            blocked.push(tokio::spawn(async move {
                pool.submit(move || {
                    while release.load(Ordering::SeqCst) == 0 {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                })
                .await
            }));
        }

        // Give the two jobs time to occupy the worker and the queue slot
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = pool.submit(|| ()).await.unwrap_err();
        assert!(matches!(err, Error::ServerBusy(_)));

        release.store(1, Ordering::SeqCst);
        for handle in blocked {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let pool = WorkerPool::new(1, 1).unwrap();
        pool.shutdown();
        let err = pool.submit(|| ()).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
