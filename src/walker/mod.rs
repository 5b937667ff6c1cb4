//! Catalog-graph traversal drivers
//!
//! Two drivers share one observable contract: visit every catalog reachable
//! from the entry points, consult the visit filter, and hand each loaded
//! catalog to the registered listeners exactly once, in the requested
//! order.
//!
//! # Architecture
//!
//! ```text
//!  entry points (HEAD / hash list / named snapshots)
//!        │
//!        ▼
//!  ┌──────────────┐   pop    ┌─────────────┐   fetch   ┌─────────────┐
//!  │   Frontier   │ ───────► │   Driver    │ ────────► │   Object    │
//!  │ (catalog     │ ◄─────── │ sequential/ │ ◄──────── │   Fetcher   │
//!  │  references) │   push   │  parallel   │  Catalog  └─────────────┘
//!  └──────────────┘ children └──────┬──────┘
//!                    + previous     │ emit (pre- or post-order)
//!                                   ▼
//!                          ┌─────────────────┐
//!                          │ Listener fanout │
//!                          └─────────────────┘
//! ```
//!
//! The sequential driver ([`CatalogWalker`]) runs the loop on the calling
//! thread; the parallel driver ([`ParallelWalker`]) fans the fetches out
//! over a worker pool while preserving the per-subtree ordering
//! guarantees.

pub mod filter;
pub mod frontier;
pub mod listener;
pub mod parallel;
pub mod sequential;

pub use filter::{Cutoffs, VisitFilter};
pub use frontier::{CatalogJob, Frontier, QueueStats, WorkQueue};
pub use listener::{CatalogVisit, ListenerId};
pub use parallel::ParallelWalker;
pub use sequential::CatalogWalker;

/// Counters published by a traversal driver
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkStats {
    /// Catalogs handed to the listener fanout
    pub visited: u64,

    /// References pruned by the dedup filter
    pub pruned: u64,

    /// Load failures downgraded to skips by `ignore_load_failure`
    pub load_failures_ignored: u64,

    /// Emitted revision roots (tree level 0)
    pub revision_roots: u64,
}
