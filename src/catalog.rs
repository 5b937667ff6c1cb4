//! Catalog records and frontier references
//!
//! A catalog is a serialized directory-listing fragment identified by its
//! content hash. Catalogs form two graphs at once:
//!
//! - the *mount tree* of one revision, via the ordered list of nested
//!   children, and
//! - the *history chain*, via the previous-revision pointer stored in each
//!   root catalog (the same mount point one revision earlier).
//!
//! Back-references (parent, previous revision) are plain hashes, never
//! in-memory pointers; a consumer that needs the parent record looks it up
//! at emission time.

use crate::hash::ObjectId;
use serde::{Deserialize, Serialize};

/// Reference to a nested child catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedEntry {
    /// Content hash of the child catalog
    pub hash: ObjectId,

    /// Mount point of the child (always below the parent's mount point)
    pub mount_path: String,
}

/// In-memory catalog record as returned by the object fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Content hash of this catalog
    pub hash: ObjectId,

    /// Mount point; empty for a revision's root catalog
    pub mount_path: String,

    /// Repository revision this catalog belongs to
    pub revision: u32,

    /// Last-modified timestamp, Unix epoch seconds
    pub timestamp: i64,

    /// Hash of the parent catalog, if nested
    pub parent_hash: Option<ObjectId>,

    /// Root catalog of the same mount point one revision earlier;
    /// `None` at revision 1 or when the chain was severed
    pub previous_hash: Option<ObjectId>,

    /// Nested children in declared order
    pub nested: Vec<NestedEntry>,
}

impl Catalog {
    /// A root catalog sits at the empty mount path
    pub fn is_root(&self) -> bool {
        self.mount_path.is_empty()
    }
}

/// A pending catalog reference in the traversal frontier
///
/// The expected fields let the driver reject a fetch that returns something
/// inconsistent with the edge that produced the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRef {
    /// Content hash to fetch
    pub hash: ObjectId,

    /// Mount path this reference is expected to resolve to
    pub mount_path: String,

    /// Revision the caller expects, if known
    pub expected_revision: Option<u32>,

    /// Nesting depth below the revision root (0 = root)
    pub tree_level: u32,

    /// Number of previous-revision edges followed to reach this reference
    /// (0 = traversal entry revision)
    pub history_depth: u32,
}

impl CatalogRef {
    /// Reference to a revision root at the traversal entry point
    pub fn root(hash: ObjectId) -> Self {
        Self {
            hash,
            mount_path: String::new(),
            expected_revision: None,
            tree_level: 0,
            history_depth: 0,
        }
    }

    /// Reference to the same mount point one revision earlier
    pub fn previous(hash: ObjectId, history_depth: u32) -> Self {
        Self {
            hash,
            mount_path: String::new(),
            expected_revision: None,
            tree_level: 0,
            history_depth,
        }
    }

    /// Reference to a nested child of `parent_level`
    pub fn nested(entry: &NestedEntry, parent_level: u32, history_depth: u32) -> Self {
        Self {
            hash: entry.hash,
            mount_path: entry.mount_path.clone(),
            expected_revision: None,
            tree_level: parent_level + 1,
            history_depth,
        }
    }

    /// Check a fetched catalog against this reference; returns a
    /// description of the first mismatch, if any
    pub fn mismatch(&self, catalog: &Catalog) -> Option<String> {
        if catalog.hash != self.hash {
            return Some(format!(
                "fetched hash {} differs from requested {}",
                catalog.hash, self.hash
            ));
        }
        if catalog.mount_path != self.mount_path {
            return Some(format!(
                "mount path '{}' does not match expected '{}'",
                catalog.mount_path, self.mount_path
            ));
        }
        if let Some(expected) = self.expected_revision {
            if catalog.revision != expected {
                return Some(format!(
                    "revision {} does not match expected {}",
                    catalog.revision, expected
                ));
            }
        }
        None
    }
}
