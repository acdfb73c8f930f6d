//! Per-publication bounded delivery queue and its worker threads.

use crate::data_plane::connection::Connection;
use crate::data_plane::delivery_worker::DeliveryWorker;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::observability::events;
use crate::statistics::StatisticsHook;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

const COMPONENT: &str = "delivery_pool";

pub(crate) type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DeliveryItem>>>;

/// One file waiting for delivery. Dropping it deletes the temp file.
pub(crate) struct DeliveryItem {
    pub(crate) file: NamedTempFile,
    pub(crate) metadata: Metadata,
}

/// Everything a worker needs to deliver for one publication.
pub(crate) struct DeliveryTarget {
    pub(crate) publication: String,
    pub(crate) connection: Connection,
    pub(crate) statistics_ok: Vec<Arc<dyn StatisticsHook>>,
    pub(crate) statistics_error: Vec<Arc<dyn StatisticsHook>>,
}

/// Result of handing a file to a publication.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnqueueOutcome {
    Queued,
    /// A decorator discarded the file.
    Discarded,
    /// A decorator failed; the delivery was abandoned.
    DecorationFailed,
    /// The queue was at capacity; the file was dropped.
    QueueFull,
    /// The publication has been stopped.
    Stopped,
}

pub(crate) struct DeliveryPool {
    queue: mpsc::Sender<DeliveryItem>,
    capacity: usize,
    shutdown: watch::Sender<bool>,
    stopped: AtomicBool,
    workers: Mutex<Vec<DeliveryWorker>>,
}

impl DeliveryPool {
    /// Starts `threads` workers draining a queue of `queue_size` items. Both are at least 1.
    pub(crate) fn start(target: DeliveryTarget, threads: usize, queue_size: usize) -> Result<Self> {
        let capacity = queue_size.max(1);
        let (queue, receiver) = mpsc::channel(capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let target = Arc::new(target);

        let mut workers = Vec::with_capacity(threads.max(1));
        for _ in 0..threads.max(1) {
            match DeliveryWorker::spawn(target.clone(), receiver.clone(), shutdown_rx.clone()) {
                Ok(worker) => {
                    debug!(
                        event = events::DELIVERY_WORKER_START,
                        component = COMPONENT,
                        publication = target.publication.as_str(),
                        worker_id = worker.worker_id(),
                        worker_thread = worker.runtime_thread(),
                        "delivery worker spawned"
                    );
                    workers.push(worker);
                }
                Err(err) => {
                    shutdown.send_replace(true);
                    return Err(err.into());
                }
            }
        }

        Ok(Self {
            queue,
            capacity,
            shutdown,
            stopped: AtomicBool::new(false),
            workers: Mutex::new(workers),
        })
    }

    /// Non-blocking insertion. A rejected item is dropped, which releases its file.
    pub(crate) fn try_enqueue(&self, item: DeliveryItem) -> EnqueueOutcome {
        if self.is_stopped() {
            return EnqueueOutcome::Stopped;
        }

        match self.queue.try_send(item) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(TrySendError::Full(_)) => EnqueueOutcome::QueueFull,
            Err(TrySendError::Closed(_)) => EnqueueOutcome::Stopped,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently waiting in the queue.
    pub(crate) fn queued(&self) -> usize {
        self.capacity.saturating_sub(self.queue.capacity())
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Signals shutdown and joins every worker. Blocks until in-flight deliveries finish.
    ///
    /// Only the first call joins; later calls return immediately.
    pub(crate) fn stop(&self, publication: &str) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for worker in workers {
            let worker_id = worker.worker_id().to_string();
            if worker.join().is_err() {
                warn!(
                    event = events::DELIVERY_WORKER_JOIN_FAILED,
                    component = COMPONENT,
                    publication,
                    worker_id = worker_id.as_str(),
                    "delivery worker thread panicked"
                );
            }
        }
    }
}

impl Drop for DeliveryPool {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.shutdown.send_replace(true);
    }
}
