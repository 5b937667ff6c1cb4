//! Object fetcher contract
//!
//! The traversal drivers never talk to storage directly; they are handed a
//! capability object that can open catalogs by hash, discover the
//! repository HEAD, and open the history database. Production fetchers
//! download, verify and decompress objects; the test fetcher serves them
//! from memory (see [`crate::mock`]).

use crate::catalog::{Catalog, CatalogRef};
use crate::error::FetchResult;
use crate::hash::ObjectId;
use crate::history::HistoryProvider;

/// Capability interface injected into the traversal drivers
///
/// Implementations must be cheap to call repeatedly; the parallel driver
/// invokes `fetch_catalog` from many worker threads at once.
pub trait ObjectFetcher {
    /// Open the catalog named by `reference`
    ///
    /// The driver validates the returned record against the reference; the
    /// fetcher only has to locate and decode it.
    fn fetch_catalog(&self, reference: &CatalogRef) -> FetchResult<Catalog>;

    /// Discover the repository HEAD: the root catalog hash of the newest
    /// revision, as recorded in the manifest
    fn fetch_manifest(&self) -> FetchResult<ObjectId>;

    /// Open the history database (named snapshots)
    ///
    /// Returns `NotFound` when the repository keeps no history; callers
    /// treat that as an empty snapshot list, not as a failure.
    fn fetch_history(&self) -> FetchResult<Box<dyn HistoryProvider>>;
}

impl<T: ObjectFetcher + ?Sized> ObjectFetcher for &T {
    fn fetch_catalog(&self, reference: &CatalogRef) -> FetchResult<Catalog> {
        (**self).fetch_catalog(reference)
    }

    fn fetch_manifest(&self) -> FetchResult<ObjectId> {
        (**self).fetch_manifest()
    }

    fn fetch_history(&self) -> FetchResult<Box<dyn HistoryProvider>> {
        (**self).fetch_history()
    }
}
