//! Parallel traversal driver
//!
//! Same observable contract as the sequential driver, with the fetch (the
//! expensive step) fanned out over a pool of worker threads.
//!
//! # How ordering survives the pool
//!
//! - *Pre-order*: a catalog is emitted on load, before its children are
//!   enqueued, so the parent-before-descendant property holds per subtree.
//!   Sibling interleaving across subtrees is unspecified.
//! - *Post-order*: every job carries an outstanding-children counter.
//!   Children (and, for roots, the previous revision) are enqueued after
//!   the parent is loaded; whichever worker resolves the last child emits
//!   the parent and walks on up the spine. Atomic decrement-and-test makes
//!   the zero transition, and therefore the emission, happen exactly once.
//!
//! # Dedup under concurrency
//!
//! With `no_repeat_history`, a hash reached a second time while its first
//! job is still in flight must neither be emitted again nor release its
//! post-order parent early. Such references are parked on the in-flight
//! job and resolved as prunes when it completes, so a parent never
//! emits before the shared subtree is finished.
//!
//! # Failure
//!
//! The first fatal load failure records the error and raises a stop flag;
//! workers drain remaining references without emitting and the traversal
//! returns the recorded error. With `ignore_load_failure`, failing
//! references are resolved as leaves and never propagate.

use crate::catalog::{Catalog, CatalogRef};
use crate::error::{FetchError, Result, WalkError};
use crate::fetcher::ObjectFetcher;
use crate::hash::ObjectId;
use crate::params::{TraversalOrder, TraversalParams};
use crate::walker::filter::{Cutoffs, VisitFilter};
use crate::walker::frontier::WorkQueue;
use crate::walker::listener::{CatalogVisit, ListenerId, ListenerSet};
use crate::walker::WalkStats;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use tracing::{error, info, warn};

#[derive(Default)]
struct SharedStats {
    visited: AtomicU64,
    pruned: AtomicU64,
    load_failures_ignored: AtomicU64,
    revision_roots: AtomicU64,
}

impl SharedStats {
    fn snapshot(&self) -> WalkStats {
        WalkStats {
            visited: self.visited.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            load_failures_ignored: self.load_failures_ignored.load(Ordering::Relaxed),
            revision_roots: self.revision_roots.load(Ordering::Relaxed),
        }
    }
}

/// One catalog reference in flight through the pool
struct PoolJob {
    reference: CatalogRef,

    /// Emitting parent within the same revision (listener payload)
    parent_hash: Option<ObjectId>,

    /// Post-order dependency: the job whose counter we resolve on
    /// completion (`None` in pre-order mode and for entry roots)
    parent: Option<Arc<PoolJob>>,

    /// Outstanding referenced catalogs (post-order)
    pending: AtomicUsize,

    /// Loaded catalog, set once between fetch and emission
    catalog: OnceLock<Arc<Catalog>>,

    /// Duplicate references parked on this in-flight job
    waiting: Mutex<Vec<Arc<PoolJob>>>,
}

impl PoolJob {
    fn new(
        reference: CatalogRef,
        parent_hash: Option<ObjectId>,
        parent: Option<Arc<PoolJob>>,
    ) -> Self {
        Self {
            reference,
            parent_hash,
            parent,
            pending: AtomicUsize::new(0),
            catalog: OnceLock::new(),
            waiting: Mutex::new(Vec::new()),
        }
    }
}

/// Shared state of one traversal run
struct Pool {
    queue: WorkQueue<Arc<PoolJob>>,

    /// In-flight jobs by hash, for duplicate attachment (dedup only)
    registry: Mutex<HashMap<ObjectId, Arc<PoolJob>>>,

    /// Jobs created but not yet resolved; zero means the run is complete
    outstanding: AtomicUsize,

    /// Raised on the first fatal failure
    stop: AtomicBool,

    /// First fatal failure, reported after the pool drains
    failure: Mutex<Option<WalkError>>,

    order: TraversalOrder,
    cutoffs: Cutoffs,
    workers: usize,
}

impl Pool {
    /// Account one resolved job; the last resolution shuts the pool down
    fn finish_item(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.queue.shutdown(self.workers);
        }
    }

    fn fail(&self, error: WalkError) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
        self.stop.store(true, Ordering::Release);
    }
}

/// Worker-pool catalog-graph traversal driver
///
/// Requires the fetcher to be shareable across threads; everything else
/// matches [`CatalogWalker`](crate::walker::sequential::CatalogWalker).
pub struct ParallelWalker<F> {
    fetcher: F,
    params: TraversalParams,
    filter: VisitFilter,
    listeners: Mutex<ListenerSet>,
    retained: Mutex<Vec<Arc<Catalog>>>,
    stats: SharedStats,
}

impl<F: ObjectFetcher + Sync> ParallelWalker<F> {
    pub fn new(fetcher: F, params: TraversalParams) -> Result<Self> {
        params.validate()?;
        let filter = VisitFilter::new(params.no_repeat_history);
        Ok(Self {
            fetcher,
            params,
            filter,
            listeners: Mutex::new(ListenerSet::new()),
            retained: Mutex::new(Vec::new()),
            stats: SharedStats::default(),
        })
    }

    /// Register a listener; invoked once per emitted catalog, serialized
    pub fn register_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: FnMut(&CatalogVisit) + Send + 'static,
    {
        self.listeners.lock().register(listener)
    }

    /// Remove a listener; returns false when the id is unknown
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.lock().unregister(id)
    }

    /// Counters accumulated over all traversals of this driver
    pub fn stats(&self) -> WalkStats {
        self.stats.snapshot()
    }

    /// Catalogs kept after emission (`no_close`); draining transfers
    /// ownership to the caller
    pub fn take_retained(&mut self) -> Vec<Arc<Catalog>> {
        std::mem::take(&mut *self.retained.lock())
    }

    /// Traverse from the repository HEAD discovered via the manifest
    pub fn traverse(&mut self, order: TraversalOrder) -> Result<()> {
        let head = self.fetcher.fetch_manifest()?;
        self.traverse_root(head, order)
    }

    /// Traverse from the given root catalog
    pub fn traverse_root(&mut self, root: ObjectId, order: TraversalOrder) -> Result<()> {
        let cutoffs = Cutoffs::from_params(&self.params);
        self.run(&[root], order, cutoffs)
    }

    /// Traverse several entry points in one call
    pub fn traverse_list(&mut self, roots: &[ObjectId], order: TraversalOrder) -> Result<()> {
        let cutoffs = Cutoffs::from_params(&self.params);
        self.run(roots, order, cutoffs)
    }

    /// Traverse exactly one revision: history depth and timestamp floor
    /// are ignored and the previous-revision edge is never followed
    pub fn traverse_revision(&mut self, root: ObjectId, order: TraversalOrder) -> Result<()> {
        self.run(&[root], order, Cutoffs::entry_revision_only())
    }

    /// Traverse every named snapshot, in the history's insertion order
    ///
    /// Snapshot selection ignores the cutoffs; each per-snapshot
    /// sub-traversal honours them. Dedup state spans all sub-traversals.
    pub fn traverse_named_snapshots(&mut self, order: TraversalOrder) -> Result<()> {
        let history = match self.fetcher.fetch_history() {
            Ok(history) => history,
            Err(FetchError::NotFound { .. }) => {
                if !self.params.quiet {
                    info!("no history database found, nothing to traverse");
                }
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let tags = history.list()?;
        let cutoffs = Cutoffs::from_params(&self.params);
        for tag in &tags {
            if !self.params.quiet {
                info!(tag = %tag.name, revision = tag.revision, "traversing named snapshot");
            }
            self.run(&[tag.root_hash], order, cutoffs)?;
        }
        Ok(())
    }

    fn run(&self, roots: &[ObjectId], order: TraversalOrder, cutoffs: Cutoffs) -> Result<()> {
        if roots.is_empty() {
            return Ok(());
        }

        let pool = Pool {
            queue: WorkQueue::new(self.params.frontier_capacity),
            registry: Mutex::new(HashMap::new()),
            // every root is accounted before the first job can resolve,
            // so the pool cannot shut down between two seeds
            outstanding: AtomicUsize::new(roots.len()),
            stop: AtomicBool::new(false),
            failure: Mutex::new(None),
            order,
            cutoffs,
            workers: self.params.num_threads,
        };

        thread::scope(|scope| -> Result<()> {
            let mut spawned = 0;
            for worker_id in 0..self.params.num_threads {
                let spawn_result = thread::Builder::new()
                    .name(format!("catalog-walker-{}", worker_id))
                    .spawn_scoped(scope, || self.worker_loop(&pool));
                match spawn_result {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        pool.queue.shutdown(spawned);
                        return Err(e.into());
                    }
                }
            }

            for root in roots {
                let job = Arc::new(PoolJob::new(CatalogRef::root(*root), None, None));
                pool.queue.push_blocking(job);
            }
            Ok(())
        })?;

        if let Some(error) = pool.failure.lock().take() {
            return Err(error);
        }
        Ok(())
    }

    fn worker_loop(&self, pool: &Pool) {
        while let Some(job) = pool.queue.pop() {
            self.process(pool, job);
        }
    }

    fn process(&self, pool: &Pool, job: Arc<PoolJob>) {
        if pool.stop.load(Ordering::Acquire) {
            self.resolve_dropped(pool, &job);
            return;
        }

        if self.filter.dedups() {
            let mut registry = pool.registry.lock();
            if let Some(in_flight) = registry.get(&job.reference.hash) {
                // park on the twin; resolved as a prune when it completes,
                // which keeps post-order parents waiting on the shared
                // subtree
                in_flight.waiting.lock().push(job);
                return;
            }
            if self.filter.should_prune(&job.reference.hash) {
                drop(registry);
                self.resolve_pruned(pool, &job);
                return;
            }
            registry.insert(job.reference.hash, Arc::clone(&job));
        }

        let catalog = match self.load(&job.reference) {
            Ok(catalog) => Arc::new(catalog),
            Err(WalkError::Fetch(e)) if self.params.ignore_load_failure && e.is_ignorable() => {
                self.stats
                    .load_failures_ignored
                    .fetch_add(1, Ordering::Relaxed);
                if !self.params.quiet {
                    warn!(
                        catalog = %job.reference.hash,
                        error = %e,
                        "catalog unavailable, pruning its subtree"
                    );
                }
                // failed catalogs are not marked visited: a later
                // reference retries the fetch
                self.resolve_registered(pool, &job);
                return;
            }
            Err(e) => {
                if !self.params.quiet {
                    error!(catalog = %job.reference.hash, error = %e, "traversal aborted");
                }
                // the stop flag is raised before resolution, so the
                // parent chain unwinds without further emissions; parked
                // duplicates must still be released
                pool.fail(e);
                self.resolve_registered(pool, &job);
                return;
            }
        };

        let _ = job.catalog.set(Arc::clone(&catalog));
        self.filter.mark_visited(&job.reference.hash);

        let children = self.referenced_jobs(pool, &job, &catalog);

        match pool.order {
            TraversalOrder::BreadthFirst => {
                // emitted before any child is enqueued: parent-before-child
                self.emit(&job, &catalog);
                pool.outstanding.fetch_add(children.len(), Ordering::AcqRel);
                for child in children {
                    self.dispatch(pool, child);
                }
                self.resolve_registered(pool, &job);
            }
            TraversalOrder::DepthFirst => {
                if children.is_empty() {
                    self.emit(&job, &catalog);
                    self.resolve_registered(pool, &job);
                } else {
                    // the counter must be in place before any child can
                    // resolve
                    job.pending.store(children.len(), Ordering::Release);
                    pool.outstanding.fetch_add(children.len(), Ordering::AcqRel);
                    for child in children {
                        self.dispatch(pool, child);
                    }
                }
            }
        }
    }

    fn load(&self, reference: &CatalogRef) -> Result<Catalog> {
        let catalog = self.fetcher.fetch_catalog(reference)?;
        if let Some(detail) = reference.mismatch(&catalog) {
            return Err(WalkError::InvariantViolation {
                hash: reference.hash,
                detail,
            });
        }
        Ok(catalog)
    }

    /// Build the referenced jobs of a freshly loaded catalog: nested
    /// children plus, for roots within the cutoffs, the previous revision
    fn referenced_jobs(
        &self,
        pool: &Pool,
        job: &Arc<PoolJob>,
        catalog: &Arc<Catalog>,
    ) -> Vec<Arc<PoolJob>> {
        let dependency = match pool.order {
            TraversalOrder::DepthFirst => Some(Arc::clone(job)),
            TraversalOrder::BreadthFirst => None,
        };

        let mut children = Vec::with_capacity(catalog.nested.len() + 1);
        for entry in &catalog.nested {
            let reference =
                CatalogRef::nested(entry, job.reference.tree_level, job.reference.history_depth);
            children.push(Arc::new(PoolJob::new(
                reference,
                Some(catalog.hash),
                dependency.clone(),
            )));
        }

        if let Some(reference) = pool.cutoffs.previous_reference(catalog, &job.reference) {
            children.push(Arc::new(PoolJob::new(reference, None, dependency)));
        }

        children
    }

    fn dispatch(&self, pool: &Pool, job: Arc<PoolJob>) {
        if let Some(job) = pool.queue.push(job) {
            // frontier at its high-water mark: walk this reference inline
            self.process(pool, job);
        }
    }

    /// Resolve a job that went through the registry (loaded or failed):
    /// release parked duplicates, the post-order parent, and its pool slot
    fn resolve_registered(&self, pool: &Pool, job: &Arc<PoolJob>) {
        self.drain_waiting(pool, job);
        if pool.order == TraversalOrder::DepthFirst {
            self.complete_parent(pool, job);
        }
        pool.finish_item();
    }

    /// Resolve a reference pruned by the dedup filter
    fn resolve_pruned(&self, pool: &Pool, job: &Arc<PoolJob>) {
        self.stats.pruned.fetch_add(1, Ordering::Relaxed);
        if pool.order == TraversalOrder::DepthFirst {
            self.complete_parent(pool, job);
        }
        pool.finish_item();
    }

    /// Resolve a reference dropped during shutdown drain
    fn resolve_dropped(&self, pool: &Pool, job: &Arc<PoolJob>) {
        if pool.order == TraversalOrder::DepthFirst {
            self.complete_parent(pool, job);
        }
        pool.finish_item();
    }

    /// Deregister a job and resolve every duplicate parked on it
    fn drain_waiting(&self, pool: &Pool, job: &Arc<PoolJob>) {
        if !self.filter.dedups() {
            return;
        }
        let waiters = {
            let mut registry = pool.registry.lock();
            registry.remove(&job.reference.hash);
            std::mem::take(&mut *job.waiting.lock())
        };
        for waiter in waiters {
            self.resolve_pruned(pool, &waiter);
        }
    }

    /// Post-order: resolve one slot of the parent chain; emits every
    /// ancestor whose outstanding count reaches zero
    fn complete_parent(&self, pool: &Pool, job: &PoolJob) {
        let mut current = match job.parent.as_ref() {
            Some(parent) => Arc::clone(parent),
            None => return,
        };

        loop {
            if current.pending.fetch_sub(1, Ordering::AcqRel) != 1 {
                return;
            }

            // last child resolved: the parent becomes emittable
            if !pool.stop.load(Ordering::Acquire) {
                if let Some(catalog) = current.catalog.get() {
                    self.emit(&current, catalog);
                }
            }
            self.drain_waiting(pool, &current);
            pool.finish_item();

            current = match current.parent.as_ref() {
                Some(parent) => Arc::clone(parent),
                None => return,
            };
        }
    }

    fn emit(&self, job: &PoolJob, catalog: &Arc<Catalog>) {
        let visit = CatalogVisit {
            catalog: Arc::clone(catalog),
            tree_level: job.reference.tree_level,
            history_depth: job.reference.history_depth,
            parent_hash: job.parent_hash,
            is_new_revision: job.reference.tree_level == 0,
        };

        self.stats.visited.fetch_add(1, Ordering::Relaxed);
        if visit.is_new_revision {
            self.stats.revision_roots.fetch_add(1, Ordering::Relaxed);
        }

        self.listeners.lock().emit(&visit);

        if self.params.no_close {
            self.retained.lock().push(Arc::clone(catalog));
        }
    }
}
