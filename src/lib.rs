//! catalog-walker - Catalog-Graph Traversal Engine
//!
//! A traversal engine over the catalog graph of a content-addressed,
//! versioned repository. Filesystem metadata is partitioned into catalogs
//! arranged as a tree of mount points; each catalog lists its nested
//! children by content hash, and each revision's root catalog points at
//! the same mount point one revision earlier. Bulk operations such as garbage
//! collection, replication and integrity scans drive the engine to visit
//! every catalog reachable from a set of entry points.
//!
//! # Features
//!
//! - **Two emission orders**: pre-order (parent before descendants, newest
//!   revision first) and post-order (parent after descendants, oldest
//!   revision first), both with deterministic sequential semantics.
//!
//! - **Cutoff policies**: a history-depth bound, an inclusive timestamp
//!   floor on the previous-revision chain, and hash dedup across
//!   overlapping entry points.
//!
//! - **Partial-failure tolerance**: missing or unreachable catalogs either
//!   abort the traversal or prune their subtree, by configuration.
//!
//! - **Parallel driver**: a worker pool fetches catalogs concurrently
//!   while preserving the per-subtree ordering guarantees via
//!   dependency-tracked emission.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Repository (external)                        │
//! │     manifest ──► HEAD        history ──► named snapshots         │
//! │     objects  ──► catalogs by content hash                        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ ObjectFetcher / HistoryProvider
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Traversal drivers                           │
//! │   CatalogWalker (sequential)      ParallelWalker (worker pool)   │
//! │        │                               │                         │
//! │        ▼                               ▼                         │
//! │   Frontier (LIFO + deferred)      WorkQueue (bounded) +          │
//! │                                   pending-children counters      │
//! │        │                               │                         │
//! │        └───────────── VisitFilter ─────┘                         │
//! │              (history depth, timestamp floor, dedup)             │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ CatalogVisit
//!                                ▼
//!                        Listener fanout
//! ```
//!
//! # Example
//!
//! ```
//! use catalog_walker::mock::{synthetic_revision, MockRepository};
//! use catalog_walker::{CatalogWalker, TraversalOrder, TraversalParams};
//!
//! let repo = MockRepository::new();
//! let (root, created) = synthetic_revision(&repo, 1, 1_400_000_000, 10);
//! repo.set_head(root);
//!
//! let mut walker = CatalogWalker::new(&repo, TraversalParams::default());
//! walker.register_listener(|visit| {
//!     println!("{} {}", visit.catalog.revision, visit.catalog.mount_path);
//! });
//! walker.traverse(TraversalOrder::BreadthFirst).unwrap();
//! assert_eq!(walker.stats().visited as usize, created.len());
//! ```

pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod hash;
pub mod history;
pub mod mock;
pub mod params;
pub mod store;
pub mod walker;

pub use catalog::{Catalog, CatalogRef, NestedEntry};
pub use error::{
    ConfigError, FetchError, HashError, HistoryError, Result, StoreError, WalkError,
};
pub use fetcher::ObjectFetcher;
pub use hash::{ObjectId, ObjectKind};
pub use history::{HistoryProvider, InMemoryHistory, SnapshotTag, WritableHistory};
pub use params::{TraversalOrder, TraversalParams, FULL_HISTORY};
pub use store::{ImageFetcher, RepositoryImage};
pub use walker::{CatalogVisit, CatalogWalker, ListenerId, ParallelWalker, WalkStats};
