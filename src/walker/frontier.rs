//! Traversal frontier
//!
//! The frontier holds lightweight catalog references waiting to be fetched;
//! heavyweight [`Catalog`](crate::catalog::Catalog) records exist only
//! between load and release.
//!
//! Two shapes live here:
//!
//! - [`Frontier`]: the sequential driver's pair of stacks: a pending LIFO
//!   that realizes both visit orders, and a deferred stack that parks
//!   post-order parents until their outstanding children have been
//!   emitted.
//! - [`WorkQueue`]: the parallel driver's bounded channel with shutdown
//!   markers and backpressure accounting. When the queue is full the
//!   producer gets the item back and processes it inline rather than
//!   blocking, which keeps the high-water mark without risking a
//!   producer/consumer deadlock.

use crate::catalog::{Catalog, CatalogRef};
use crate::hash::ObjectId;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A unit of traversal work: one catalog reference plus bookkeeping
#[derive(Debug, Clone)]
pub struct CatalogJob {
    /// The reference to fetch
    pub reference: CatalogRef,

    /// Hash of the catalog that produced this reference within the same
    /// revision (`None` for revision roots)
    pub parent_hash: Option<ObjectId>,

    /// Loaded catalog, populated between fetch and emission
    pub catalog: Option<Arc<Catalog>>,

    /// Referenced catalogs pushed but not yet resolved (post-order)
    pub outstanding: usize,
}

impl CatalogJob {
    pub fn new(reference: CatalogRef, parent_hash: Option<ObjectId>) -> Self {
        Self {
            reference,
            parent_hash,
            catalog: None,
            outstanding: 0,
        }
    }
}

/// Sequential frontier: pending LIFO plus the deferred post-order stack
#[derive(Default)]
pub struct Frontier {
    pending: Vec<CatalogJob>,
    deferred: Vec<CatalogJob>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: CatalogJob) {
        self.pending.push(job);
    }

    pub fn pop(&mut self) -> Option<CatalogJob> {
        self.pending.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Park a job until its outstanding references have been resolved
    pub fn defer(&mut self, job: CatalogJob) {
        debug_assert!(job.outstanding > 0);
        self.deferred.push(job);
    }

    /// Record that one reference of the deferred top has been resolved;
    /// returns the job once its count reaches zero
    ///
    /// The caller emits the returned job and calls `settle` again: every
    /// emission resolves one reference of the next deferred parent, which
    /// is how a finished leaf cascades up the spine.
    pub fn settle(&mut self) -> Option<CatalogJob> {
        let top = self.deferred.last_mut()?;
        top.outstanding -= 1;
        if top.outstanding == 0 {
            self.deferred.pop()
        } else {
            None
        }
    }

    pub fn deferred_is_empty(&self) -> bool {
        self.deferred.is_empty()
    }
}

/// Counters for the parallel work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Jobs accepted by the queue
    pub enqueued: AtomicU64,

    /// Jobs handed to workers
    pub dequeued: AtomicU64,

    /// Jobs bounced back to the producer because the queue was full
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

enum WorkItem<T> {
    Task(T),
    Shutdown,
}

/// Bounded work queue for the parallel driver
pub struct WorkQueue<T> {
    tx: Sender<WorkItem<T>>,
    rx: Receiver<WorkItem<T>>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Try to enqueue; on a full queue the task is returned to the caller
    /// for inline processing
    pub fn push(&self, task: T) -> Option<T> {
        match self.tx.try_send(WorkItem::Task(task)) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(TrySendError::Full(WorkItem::Task(task))) => {
                self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            // we hold the receiver, so the channel cannot disconnect;
            // Full can only carry back what we sent
            Err(_) => unreachable!("work queue disconnected while in use"),
        }
    }

    /// Enqueue, blocking until there is room (used for seeding while the
    /// workers are already draining)
    pub fn push_blocking(&self, task: T) {
        if self.tx.send(WorkItem::Task(task)).is_ok() {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Blocking dequeue; `None` signals shutdown
    pub fn pop(&self) -> Option<T> {
        match self.rx.recv() {
            Ok(WorkItem::Task(task)) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Ok(WorkItem::Shutdown) | Err(_) => None,
        }
    }

    /// Wake `workers` blocked consumers for shutdown
    ///
    /// Only called once the queue has drained, so the markers always fit.
    pub fn shutdown(&self, workers: usize) {
        for _ in 0..workers {
            let _ = self.tx.send(WorkItem::Shutdown);
        }
    }
}
