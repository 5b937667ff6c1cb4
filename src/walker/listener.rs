//! Listener registration and fanout
//!
//! Listeners are closures owned by the caller (typically a test harness or
//! a bulk operation such as garbage collection). Each emission invokes
//! every registered listener exactly once with a borrowed payload; a
//! listener that wants to keep the catalog clones the `Arc`.
//!
//! Panics inside a listener are not caught.

use crate::catalog::Catalog;
use crate::hash::ObjectId;
use std::sync::Arc;

/// Payload delivered to listeners, once per emitted catalog
#[derive(Clone)]
pub struct CatalogVisit {
    /// The loaded catalog
    pub catalog: Arc<Catalog>,

    /// Nesting depth below the revision root (0 = root)
    pub tree_level: u32,

    /// Previous-revision edges followed to reach this catalog
    pub history_depth: u32,

    /// Hash of the parent catalog within the same revision, if nested
    pub parent_hash: Option<ObjectId>,

    /// True when this emission opens a revision (the catalog is a
    /// revision root)
    pub is_new_revision: bool,
}

/// Handle returned by listener registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerFn = Box<dyn FnMut(&CatalogVisit) + Send>;

/// Ordered set of registered listeners
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: Vec<(ListenerId, ListenerFn)>,
    next_id: u64,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register<L>(&mut self, listener: L) -> ListenerId
    where
        L: FnMut(&CatalogVisit) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false when the id is unknown
    pub(crate) fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, visit: &CatalogVisit) {
        for (_, listener) in self.entries.iter_mut() {
            listener(visit);
        }
    }
}
