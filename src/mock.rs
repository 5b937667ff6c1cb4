//! In-memory mock repository
//!
//! Serves catalogs, a manifest and a history database straight from maps,
//! with failure injection: any registered hash can be marked deleted, which
//! turns its fetch into `NotFound`. Tests and benches build fixtures with
//! it; an optional artificial fetch latency shakes out interleavings in
//! the parallel driver.

use crate::catalog::{Catalog, CatalogRef, NestedEntry};
use crate::error::{FetchError, FetchResult};
use crate::fetcher::ObjectFetcher;
use crate::hash::{ObjectId, ObjectKind, DIGEST_LEN};
use crate::history::{HistoryProvider, InMemoryHistory};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Mock object fetcher backed by in-memory maps
#[derive(Default)]
pub struct MockRepository {
    catalogs: RwLock<HashMap<ObjectId, Catalog>>,
    deleted: RwLock<HashSet<ObjectId>>,
    head: RwLock<Option<ObjectId>>,
    history: RwLock<Option<InMemoryHistory>>,
    fetch_delay: RwLock<Option<Duration>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog under its own hash
    pub fn insert_catalog(&self, catalog: Catalog) {
        self.catalogs.write().insert(catalog.hash, catalog);
    }

    /// Set the root hash returned by the manifest
    pub fn set_head(&self, head: ObjectId) {
        *self.head.write() = Some(head);
    }

    /// Install the history database
    pub fn set_history(&self, history: InMemoryHistory) {
        *self.history.write() = Some(history);
    }

    /// Remove the history database; `fetch_history` reports `NotFound`
    pub fn drop_history(&self) {
        *self.history.write() = None;
    }

    /// Mark an object as deleted; fetching it reports `NotFound`
    pub fn delete_object(&self, hash: ObjectId) {
        self.deleted.write().insert(hash);
    }

    /// Sleep this long inside every catalog fetch
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.write() = Some(delay);
    }

    /// Look up a registered catalog
    pub fn catalog(&self, hash: &ObjectId) -> Option<Catalog> {
        self.catalogs.read().get(hash).cloned()
    }

    /// Number of registered catalogs
    pub fn len(&self) -> usize {
        self.catalogs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.read().is_empty()
    }
}

impl ObjectFetcher for MockRepository {
    fn fetch_catalog(&self, reference: &CatalogRef) -> FetchResult<Catalog> {
        if let Some(delay) = *self.fetch_delay.read() {
            std::thread::sleep(delay);
        }
        if self.deleted.read().contains(&reference.hash) {
            return Err(FetchError::not_found(&reference.hash));
        }
        self.catalogs
            .read()
            .get(&reference.hash)
            .cloned()
            .ok_or_else(|| FetchError::not_found(&reference.hash))
    }

    fn fetch_manifest(&self) -> FetchResult<ObjectId> {
        (*self.head.read()).ok_or(FetchError::NotFound {
            object: "manifest".into(),
        })
    }

    fn fetch_history(&self) -> FetchResult<Box<dyn HistoryProvider>> {
        match &*self.history.read() {
            Some(history) => Ok(Box::new(history.clone())),
            None => Err(FetchError::NotFound {
                object: "history".into(),
            }),
        }
    }
}

/// Deterministic catalog identifier derived from a seed
pub fn synthetic_id(seed: u64) -> ObjectId {
    let mut digest = [0u8; DIGEST_LEN];
    let mut state = seed;
    for chunk in digest.chunks_mut(8) {
        state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        chunk.copy_from_slice(&z.to_le_bytes()[..chunk.len()]);
    }
    ObjectId::new(digest, ObjectKind::Catalog)
}

/// Build a single synthetic revision of `count` catalogs below the root,
/// with deterministic pseudo-random branching; returns the root hash and
/// every `(revision, mount_path)` created, root included
pub fn synthetic_revision(
    repo: &MockRepository,
    revision: u32,
    timestamp: i64,
    count: usize,
) -> (ObjectId, Vec<(u32, String)>) {
    let mut seq = (revision as u64) << 32;
    let root_hash = synthetic_id(seq);
    seq += 1;

    let mut created = vec![(revision, String::new())];
    let nested = grow(repo, "", revision, timestamp, root_hash, count, &mut seq, &mut created);

    repo.insert_catalog(Catalog {
        hash: root_hash,
        mount_path: String::new(),
        revision,
        timestamp,
        parent_hash: None,
        previous_hash: None,
        nested,
    });

    (root_hash, created)
}

#[allow(clippy::too_many_arguments)]
fn grow(
    repo: &MockRepository,
    path: &str,
    revision: u32,
    timestamp: i64,
    parent_hash: ObjectId,
    count: usize,
    seq: &mut u64,
    created: &mut Vec<(u32, String)>,
) -> Vec<NestedEntry> {
    let mut entries = Vec::new();
    let mut remaining = count;
    let mut index = 0;

    while remaining > 0 {
        // deterministic branch size in 1..=remaining
        let branch = ((remaining / ((remaining % 10) + 1)) % remaining) + 1;
        let child_path = format!("{}/{}", path, index);
        let hash = synthetic_id(*seq);
        *seq += 1;

        let nested = grow(
            repo,
            &child_path,
            revision,
            timestamp,
            hash,
            branch - 1,
            seq,
            created,
        );
        repo.insert_catalog(Catalog {
            hash,
            mount_path: child_path.clone(),
            revision,
            timestamp,
            parent_hash: Some(parent_hash),
            previous_hash: None,
            nested,
        });

        created.push((revision, child_path.clone()));
        entries.push(NestedEntry {
            hash,
            mount_path: child_path,
        });

        remaining -= branch;
        index += 1;
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_object_reports_not_found() {
        let repo = MockRepository::new();
        let hash = synthetic_id(1);
        repo.insert_catalog(Catalog {
            hash,
            mount_path: String::new(),
            revision: 1,
            timestamp: 0,
            parent_hash: None,
            previous_hash: None,
            nested: Vec::new(),
        });

        let reference = CatalogRef::root(hash);
        assert!(repo.fetch_catalog(&reference).is_ok());

        repo.delete_object(hash);
        assert!(matches!(
            repo.fetch_catalog(&reference),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_manifest_and_history() {
        let repo = MockRepository::new();
        assert!(matches!(
            repo.fetch_manifest(),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            repo.fetch_history(),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_synthetic_revision_count() {
        let repo = MockRepository::new();
        let (root, created) = synthetic_revision(&repo, 7, 1_000_000, 250);

        assert_eq!(created.len(), 251);
        assert_eq!(repo.len(), 251);
        assert!(repo.catalog(&root).is_some());

        // identifiers are unique
        let unique: std::collections::HashSet<_> = created.iter().collect();
        assert_eq!(unique.len(), created.len());
    }

    #[test]
    fn test_synthetic_ids_are_deterministic() {
        assert_eq!(synthetic_id(42), synthetic_id(42));
        assert_ne!(synthetic_id(42), synthetic_id(43));
    }
}
