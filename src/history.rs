//! Named snapshots (tags) and the history contract
//!
//! The history database maps human-readable tag names to root catalogs at
//! specific revisions. The traversal core only reads it; the writable
//! operations exist for tooling that maintains tags (and for building test
//! fixtures) and follow a begin/commit transaction discipline.

use crate::error::{HistoryError, HistoryResult};
use crate::hash::ObjectId;
use serde::{Deserialize, Serialize};

/// A named snapshot: tag name plus the root catalog it pins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTag {
    /// Human-readable tag name, unique within the history
    pub name: String,

    /// Root catalog hash of the pinned revision
    pub root_hash: ObjectId,

    /// Size of the pinned revision in bytes (informational)
    pub size: u64,

    /// Revision number of the pinned root
    pub revision: u32,

    /// Timestamp of the pinned revision, Unix epoch seconds
    pub timestamp: i64,

    /// Free-form description
    pub description: String,

    /// Release channel the tag belongs to (empty when unused)
    pub channel: String,
}

/// Read access to the history database
pub trait HistoryProvider {
    /// All tags, ordered by ascending revision and, within a revision, by
    /// insertion order
    fn list(&self) -> HistoryResult<Vec<SnapshotTag>>;

    /// Look up a single tag by name
    fn lookup(&self, name: &str) -> HistoryResult<Option<SnapshotTag>>;

    /// Root catalog of the snapshot preceding `root_hash` in the tag
    /// chain, if the hash is tagged and has a predecessor
    fn previous_of(&self, root_hash: &ObjectId) -> HistoryResult<Option<ObjectId>>;
}

/// Write access to the history database
///
/// Writes are staged inside a transaction and only become visible to
/// readers on commit.
pub trait WritableHistory: HistoryProvider {
    /// Open a transaction
    fn begin_transaction(&mut self) -> HistoryResult<()>;

    /// Publish all tags staged since `begin_transaction`
    fn commit_transaction(&mut self) -> HistoryResult<()>;

    /// Stage a tag for insertion
    fn insert(&mut self, tag: SnapshotTag) -> HistoryResult<()>;
}

/// In-memory history database
///
/// Backs the mock fetcher and the CLI's repository images; semantics match
/// the on-disk history contract.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    tags: Vec<SnapshotTag>,
    staged: Vec<SnapshotTag>,
    in_transaction: bool,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn known_name(&self, name: &str) -> bool {
        self.tags.iter().chain(self.staged.iter()).any(|t| t.name == name)
    }
}

impl HistoryProvider for InMemoryHistory {
    fn list(&self) -> HistoryResult<Vec<SnapshotTag>> {
        let mut tags = self.tags.clone();
        // stable sort keeps insertion order within one revision
        tags.sort_by_key(|t| t.revision);
        Ok(tags)
    }

    fn lookup(&self, name: &str) -> HistoryResult<Option<SnapshotTag>> {
        Ok(self.tags.iter().find(|t| t.name == name).cloned())
    }

    fn previous_of(&self, root_hash: &ObjectId) -> HistoryResult<Option<ObjectId>> {
        let tags = self.list()?;
        let position = match tags.iter().position(|t| t.root_hash == *root_hash) {
            Some(p) => p,
            None => return Ok(None),
        };
        Ok(position
            .checked_sub(1)
            .map(|prev| tags[prev].root_hash))
    }
}

impl WritableHistory for InMemoryHistory {
    fn begin_transaction(&mut self) -> HistoryResult<()> {
        self.in_transaction = true;
        Ok(())
    }

    fn commit_transaction(&mut self) -> HistoryResult<()> {
        if !self.in_transaction {
            return Err(HistoryError::NoTransaction);
        }
        self.tags.append(&mut self.staged);
        self.in_transaction = false;
        Ok(())
    }

    fn insert(&mut self, tag: SnapshotTag) -> HistoryResult<()> {
        if !self.in_transaction {
            return Err(HistoryError::NoTransaction);
        }
        if self.known_name(&tag.name) {
            return Err(HistoryError::DuplicateTag { name: tag.name });
        }
        self.staged.push(tag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{ObjectKind, DIGEST_LEN};

    fn tag(name: &str, revision: u32, byte: u8) -> SnapshotTag {
        SnapshotTag {
            name: name.into(),
            root_hash: ObjectId::new([byte; DIGEST_LEN], ObjectKind::Catalog),
            size: 0,
            revision,
            timestamp: revision as i64 * 1000,
            description: String::new(),
            channel: String::new(),
        }
    }

    #[test]
    fn test_insert_requires_transaction() {
        let mut history = InMemoryHistory::new();
        assert!(matches!(
            history.insert(tag("trunk", 1, 1)),
            Err(HistoryError::NoTransaction)
        ));
    }

    #[test]
    fn test_staged_tags_visible_after_commit() {
        let mut history = InMemoryHistory::new();
        history.begin_transaction().unwrap();
        history.insert(tag("trunk", 2, 2)).unwrap();
        assert!(history.is_empty());

        history.commit_transaction().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history.lookup("trunk").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut history = InMemoryHistory::new();
        history.begin_transaction().unwrap();
        history.insert(tag("trunk", 2, 2)).unwrap();
        assert!(matches!(
            history.insert(tag("trunk", 3, 3)),
            Err(HistoryError::DuplicateTag { .. })
        ));
    }

    #[test]
    fn test_list_orders_by_revision() {
        let mut history = InMemoryHistory::new();
        history.begin_transaction().unwrap();
        history.insert(tag("newest", 6, 6)).unwrap();
        history.insert(tag("oldest", 2, 2)).unwrap();
        history.insert(tag("middle", 5, 5)).unwrap();
        history.commit_transaction().unwrap();

        let names: Vec<_> = history
            .list()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
    }

    #[test]
    fn test_previous_of_walks_tag_chain() {
        let mut history = InMemoryHistory::new();
        history.begin_transaction().unwrap();
        history.insert(tag("a", 2, 2)).unwrap();
        history.insert(tag("b", 5, 5)).unwrap();
        history.insert(tag("c", 6, 6)).unwrap();
        history.commit_transaction().unwrap();

        let b = history.lookup("b").unwrap().unwrap();
        let a = history.lookup("a").unwrap().unwrap();
        assert_eq!(
            history.previous_of(&b.root_hash).unwrap(),
            Some(a.root_hash)
        );
        assert_eq!(history.previous_of(&a.root_hash).unwrap(), None);

        let untagged = ObjectId::new([9; DIGEST_LEN], ObjectKind::Catalog);
        assert_eq!(history.previous_of(&untagged).unwrap(), None);
    }
}
