//! Visit filter: cutoff policies and the dedup set
//!
//! Two orthogonal decisions are made here:
//!
//! - [`Cutoffs`] decides whether the history chain may be extended past a
//!   given root catalog (depth bound plus timestamp floor). The cutoffs
//!   never suppress a catalog that is already scheduled; they only stop
//!   the previous-revision edge.
//! - [`VisitFilter`] tracks emitted hashes when `no_repeat_history` is
//!   set and prunes re-encountered subtrees. The set survives across
//!   `traverse*` calls on the same driver, so overlapping entry points
//!   share one emission stream.
//!
//! The dedup set sits behind a reader-writer lock: membership probes vastly
//! outnumber insertions, and the parallel driver probes from every worker.

use crate::catalog::{Catalog, CatalogRef};
use crate::hash::ObjectId;
use crate::params::{TraversalParams, FULL_HISTORY};
use parking_lot::RwLock;
use std::collections::HashSet;

/// History-depth and timestamp bounds of one traversal
#[derive(Debug, Clone, Copy)]
pub struct Cutoffs {
    /// Maximum number of previous-revision edges to follow
    pub history_depth: u32,

    /// Roots strictly older than this stop the chain; 0 disables
    pub timestamp_floor: i64,
}

impl Cutoffs {
    pub fn from_params(params: &TraversalParams) -> Self {
        Self {
            history_depth: params.history_depth,
            timestamp_floor: params.timestamp_floor,
        }
    }

    /// Cutoffs of a single-revision walk: never leave the entry revision
    pub fn entry_revision_only() -> Self {
        Self {
            history_depth: 0,
            timestamp_floor: 0,
        }
    }

    /// True when the chain may grow past `current_depth`
    pub fn permits_deeper_history(&self, current_depth: u32) -> bool {
        self.history_depth == FULL_HISTORY || current_depth < self.history_depth
    }

    /// True when `catalog`'s own timestamp admits following its
    /// previous-revision edge (the floor is inclusive)
    pub fn permits_previous_of(&self, catalog: &Catalog) -> bool {
        self.timestamp_floor == 0 || catalog.timestamp >= self.timestamp_floor
    }

    /// The previous-revision reference of a freshly loaded catalog, if
    /// there is one and both cutoffs admit following it
    ///
    /// Only root catalogs enter a previous revision; the edge is a
    /// root-level concept.
    pub fn previous_reference(
        &self,
        catalog: &Catalog,
        reference: &CatalogRef,
    ) -> Option<CatalogRef> {
        if !catalog.is_root() {
            return None;
        }
        let previous = catalog.previous_hash?;
        if !self.permits_deeper_history(reference.history_depth) {
            return None;
        }
        if !self.permits_previous_of(catalog) {
            return None;
        }
        Some(CatalogRef::previous(previous, reference.history_depth + 1))
    }
}

/// Dedup set consulted when `no_repeat_history` is active
#[derive(Debug)]
pub struct VisitFilter {
    no_repeat: bool,
    visited: RwLock<HashSet<ObjectId>>,
}

impl VisitFilter {
    pub fn new(no_repeat: bool) -> Self {
        Self {
            no_repeat,
            visited: RwLock::new(HashSet::new()),
        }
    }

    /// True when dedup is active at all
    pub fn dedups(&self) -> bool {
        self.no_repeat
    }

    /// Should a reference to `hash` be dropped without emission?
    pub fn should_prune(&self, hash: &ObjectId) -> bool {
        self.no_repeat && self.visited.read().contains(hash)
    }

    /// Record a successfully loaded catalog
    pub fn mark_visited(&self, hash: &ObjectId) {
        if self.no_repeat {
            self.visited.write().insert(*hash);
        }
    }
}
