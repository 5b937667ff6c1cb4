//! Sequential traversal driver
//!
//! Single-threaded, stack-driven. Both emission orders run the same loop:
//! pop a reference, consult the filter, fetch, expand, emit. The pending
//! stack is a LIFO, so children pushed in declared order are visited in
//! reverse declared order; pre-order emits a catalog the moment it is
//! loaded, post-order parks it on the deferred stack until every reference
//! it pushed has been resolved.
//!
//! The previous-revision edge is a root-level concept: it is pushed below
//! the children in pre-order mode (the whole revision drains first, newest
//! to oldest) and above them in post-order mode (the chain bottoms out at
//! the oldest reachable revision, which therefore emits first).

use crate::catalog::{Catalog, CatalogRef};
use crate::error::{FetchError, Result, WalkError};
use crate::fetcher::ObjectFetcher;
use crate::hash::ObjectId;
use crate::params::{TraversalOrder, TraversalParams};
use crate::walker::filter::{Cutoffs, VisitFilter};
use crate::walker::frontier::{CatalogJob, Frontier};
use crate::walker::listener::{CatalogVisit, ListenerId, ListenerSet};
use crate::walker::WalkStats;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Single-threaded catalog-graph traversal driver
///
/// Listener registrations, the dedup set and the retained list live on the
/// driver, so repeated `traverse*` calls accumulate into one logical
/// emission stream.
pub struct CatalogWalker<F> {
    fetcher: F,
    params: TraversalParams,
    filter: VisitFilter,
    listeners: ListenerSet,
    retained: Vec<Arc<Catalog>>,
    stats: WalkStats,
}

impl<F: ObjectFetcher> CatalogWalker<F> {
    pub fn new(fetcher: F, params: TraversalParams) -> Self {
        let filter = VisitFilter::new(params.no_repeat_history);
        Self {
            fetcher,
            params,
            filter,
            listeners: ListenerSet::new(),
            retained: Vec::new(),
            stats: WalkStats::default(),
        }
    }

    /// Register a listener; invoked once per emitted catalog
    pub fn register_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: FnMut(&CatalogVisit) + Send + 'static,
    {
        self.listeners.register(listener)
    }

    /// Remove a listener; returns false when the id is unknown
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Counters accumulated over all traversals of this driver
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Catalogs kept after emission (`no_close`); draining transfers
    /// ownership to the caller
    pub fn take_retained(&mut self) -> Vec<Arc<Catalog>> {
        std::mem::take(&mut self.retained)
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

    /// Traverse several entry points in one call; earlier entries emit
    /// before later ones
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
    /// The history-depth and timestamp cutoffs never decide *which*
    /// snapshots are visited; they only bound each per-snapshot
    /// sub-traversal. With `no_repeat_history` the dedup set spans all
    /// sub-traversals.
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

    fn run(&mut self, roots: &[ObjectId], order: TraversalOrder, cutoffs: Cutoffs) -> Result<()> {
        let mut frontier = Frontier::new();
        for root in roots.iter().rev() {
            frontier.push(CatalogJob::new(CatalogRef::root(*root), None));
        }

        while let Some(mut job) = frontier.pop() {
            if self.filter.should_prune(&job.reference.hash) {
                self.stats.pruned += 1;
                self.resolve_without_emission(&mut frontier, order);
                continue;
            }

            match self.load(&job.reference) {
                Ok(catalog) => {
                    job.catalog = Some(Arc::new(catalog));
                }
                Err(WalkError::Fetch(e))
                    if self.params.ignore_load_failure && e.is_ignorable() =>
                {
                    self.stats.load_failures_ignored += 1;
                    if !self.params.quiet {
                        warn!(
                            catalog = %job.reference.hash,
                            error = %e,
                            "catalog unavailable, pruning its subtree"
                        );
                    }
                    self.resolve_without_emission(&mut frontier, order);
                    continue;
                }
                Err(e) => {
                    if !self.params.quiet {
                        error!(catalog = %job.reference.hash, error = %e, "traversal aborted");
                    }
                    return Err(e);
                }
            }

            self.filter.mark_visited(&job.reference.hash);
            job.outstanding = self.push_referenced(&mut frontier, &job, order, cutoffs);

            match order {
                TraversalOrder::BreadthFirst => self.emit(job),
                TraversalOrder::DepthFirst => {
                    if job.outstanding > 0 {
                        frontier.defer(job);
                    } else {
                        self.emit(job);
                        self.settle_deferred(&mut frontier);
                    }
                }
            }
        }

        debug_assert!(frontier.deferred_is_empty());
        Ok(())
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

    /// Push the referenced catalogs of a freshly loaded job; returns how
    /// many were pushed
    fn push_referenced(
        &self,
        frontier: &mut Frontier,
        job: &CatalogJob,
        order: TraversalOrder,
        cutoffs: Cutoffs,
    ) -> usize {
        let catalog = job
            .catalog
            .as_ref()
            .expect("referenced catalogs are pushed only after a successful load");
        let mut pushed = 0;

        let mut previous = cutoffs
            .previous_reference(catalog, &job.reference)
            .map(|reference| CatalogJob::new(reference, None));

        // LIFO discipline: whatever is pushed last is visited first
        if order == TraversalOrder::BreadthFirst {
            if let Some(previous) = previous.take() {
                frontier.push(previous);
                pushed += 1;
            }
        }

        for entry in &catalog.nested {
            let reference =
                CatalogRef::nested(entry, job.reference.tree_level, job.reference.history_depth);
            frontier.push(CatalogJob::new(reference, Some(catalog.hash)));
            pushed += 1;
        }

        // depth-first: the previous revision pops before the children and
        // therefore emits first
        if let Some(previous) = previous {
            frontier.push(previous);
            pushed += 1;
        }

        pushed
    }

    /// A pruned or failed reference still resolves one slot of the
    /// deferred post-order parent
    fn resolve_without_emission(&mut self, frontier: &mut Frontier, order: TraversalOrder) {
        if order == TraversalOrder::DepthFirst {
            self.settle_deferred(frontier);
        }
    }

    fn settle_deferred(&mut self, frontier: &mut Frontier) {
        while let Some(job) = frontier.settle() {
            self.emit(job);
        }
    }

    fn emit(&mut self, job: CatalogJob) {
        let catalog = job
            .catalog
            .expect("emitted jobs always carry their loaded catalog");

        let visit = CatalogVisit {
            catalog: Arc::clone(&catalog),
            tree_level: job.reference.tree_level,
            history_depth: job.reference.history_depth,
            parent_hash: job.parent_hash,
            is_new_revision: job.reference.tree_level == 0,
        };

        self.stats.visited += 1;
        if visit.is_new_revision {
            self.stats.revision_roots += 1;
        }

        self.listeners.emit(&visit);

        if self.params.no_close {
            self.retained.push(catalog);
        }
    }
}
