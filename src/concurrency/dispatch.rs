//! Bounded queue + fixed worker pool for fire-and-forget jobs.
//!
//! ```text
//! try_submit ──try_send──▶ mpsc (queue_capacity) ──▶ dispatch loop ──permit──▶ spawn(job)
//!      │                                                  ▲
//!      └── queue full: job dropped, logged, counted       └── WorkerPool (workers)
//! ```
//!
//! Submitting never waits. Shutdown stops intake, runs whatever is still queued and
//! waits for running jobs.

use super::WorkerPool;
use crate::metrics::PoolUsage;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{0} queue is full")]
    QueueFull(String),

    #[error("{0} is shut down")]
    Closed(String),
}

pub struct TaskDispatcher {
    name: String,
    sender: mpsc::Sender<Job>,
    queue_capacity: usize,
    workers: WorkerPool,
    dropped: AtomicU64,
    closed: AtomicBool,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskDispatcher {
    /// Spawns the dispatch loop. Must be called inside a Tokio runtime.
    pub fn start(name: impl Into<String>, workers: usize, queue_capacity: usize) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let workers = WorkerPool::new(format!("{name} workers"), workers);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(dispatch_loop(
            name.clone(),
            receiver,
            workers.clone(),
            shutdown.clone(),
        ));

        Self {
            name,
            sender,
            queue_capacity: queue_capacity.max(1),
            workers,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues `job` without waiting. A full queue drops the job.
    pub fn try_submit<F>(&self, job: F) -> Result<(), DispatchError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DispatchError::Closed(self.name.clone()));
        }
        match self.sender.try_send(Box::pin(job)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dispatcher = %self.name, dropped, "Queue full, dropping job");
                Err(DispatchError::QueueFull(self.name.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(DispatchError::Closed(self.name.clone()))
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn worker_usage(&self) -> PoolUsage {
        self.workers.usage()
    }

    pub fn queue_usage(&self) -> PoolUsage {
        PoolUsage {
            in_use: self.queue_capacity.saturating_sub(self.sender.capacity()),
            capacity: self.queue_capacity,
        }
    }

    /// Stops intake, runs queued jobs and waits for running ones.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(dispatcher = %self.name, error = %e, "Dispatch loop failed");
            }
        }
    }
}

async fn dispatch_loop(
    name: String,
    mut receiver: mpsc::Receiver<Job>,
    workers: WorkerPool,
    shutdown: CancellationToken,
) {
    info!(dispatcher = %name, workers = workers.capacity(), "Dispatcher started");

    loop {
        let job = tokio::select! {
            biased;
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        };
        if !run(&workers, job).await {
            break;
        }
    }

    receiver.close();
    let mut drained = 0usize;
    while let Ok(job) = receiver.try_recv() {
        if !run(&workers, job).await {
            break;
        }
        drained += 1;
    }
    if !workers.drain(Duration::from_secs(30)).await {
        warn!(dispatcher = %name, "Jobs still running at shutdown");
    }
    info!(dispatcher = %name, drained, "Dispatcher stopped");
}

/// Waits for a worker slot and spawns `job` on it. False when the pool is closed.
async fn run(workers: &WorkerPool, job: Job) -> bool {
    match workers.acquire(Duration::MAX).await {
        Ok(slot) => {
            tokio::spawn(async move {
                job.await;
                drop(slot);
            });
            debug!(in_use = workers.usage().in_use, "Job started");
            true
        }
        Err(_) => false,
    }
}
