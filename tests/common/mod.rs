//! Shared test fixture: a six-revision repository with named snapshots
//!
//! Revision history (each revision has one root catalog at ""):
//!
//! - Revision 1: root only                                   (27.11.1987)
//! - Revision 2: adds branch /00/10                          (24.12.2004)
//! - Revision 3: adds branch /00/11, keeps /00/10 of rev 2   (06.03.2009)
//! - Revision 4: adds /00/12, recreates /00/11               (18.07.2010)
//! - Revision 5: adds /00/13, keeps 10@2, 11@4, 12@4         (16.11.2014)
//! - Revision 6: drops /00/10                                (17.11.2014)
//!
//! Named snapshots point at revisions 2, 5 and 6. 42 distinct catalogs
//! exist across all revisions.

#![allow(dead_code)]

use catalog_walker::mock::{synthetic_id, MockRepository};
use catalog_walker::{
    Catalog, CatalogVisit, InMemoryHistory, NestedEntry, ObjectId, SnapshotTag, WritableHistory,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// `(revision, mount_path)` of an emitted catalog
pub type Identifier = (u32, String);

/// Midnight UTC of the given date as epoch seconds
pub fn t(day: u32, month: u32, year: i32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .unwrap()
        .timestamp()
}

/// Branch layout: (mount path, nested children in declared order),
/// listed in creation order
type BranchLayout = &'static [(&'static str, &'static [&'static str])];

const BRANCH_10: BranchLayout = &[
    ("/00/10", &["/00/10/20", "/00/10/21"]),
    ("/00/10/20", &["/00/10/20/30", "/00/10/20/31", "/00/10/20/32"]),
    ("/00/10/21", &[]),
    ("/00/10/20/30", &["/00/10/20/30/40"]),
    ("/00/10/20/31", &[]),
    ("/00/10/20/32", &[]),
    ("/00/10/20/30/40", &[]),
];

const BRANCH_11: BranchLayout = &[
    ("/00/11", &["/00/11/22", "/00/11/23", "/00/11/24"]),
    ("/00/11/22", &["/00/11/22/33", "/00/11/22/34"]),
    ("/00/11/23", &[]),
    ("/00/11/24", &[]),
    ("/00/11/22/33", &[]),
    ("/00/11/22/34", &["/00/11/22/34/41", "/00/11/22/34/42", "/00/11/22/34/43"]),
    ("/00/11/22/34/41", &[]),
    ("/00/11/22/34/42", &[]),
    ("/00/11/22/34/43", &[]),
];

const BRANCH_12: BranchLayout = &[
    ("/00/12", &["/00/12/25", "/00/12/26", "/00/12/27"]),
    ("/00/12/25", &[]),
    ("/00/12/26", &["/00/12/26/35", "/00/12/26/36", "/00/12/26/37", "/00/12/26/38"]),
    ("/00/12/27", &[]),
    ("/00/12/26/35", &[]),
    ("/00/12/26/36", &[]),
    ("/00/12/26/37", &[]),
    ("/00/12/26/38", &[]),
];

const BRANCH_13: BranchLayout = &[
    ("/00/13", &["/00/13/28", "/00/13/29"]),
    ("/00/13/28", &[]),
    ("/00/13/29", &[]),
];

/// The six-revision mock repository
pub struct Fixture {
    pub repo: MockRepository,
    ids: HashMap<(u32, String), ObjectId>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut builder = Builder {
            repo: MockRepository::new(),
            ids: HashMap::new(),
        };

        // revision roots and their nested catalogs, in registration order
        builder.make_root(1, t(27, 11, 1987), &[]);

        builder.make_branch(BRANCH_10, 2, t(24, 12, 2004), 1);
        builder.make_root(2, t(24, 12, 2004), &[(2, "/00/10")]);

        builder.make_branch(BRANCH_11, 3, t(6, 3, 2009), 8);
        builder.make_root(3, t(6, 3, 2009), &[(3, "/00/11"), (2, "/00/10")]);

        builder.make_branch(BRANCH_12, 4, t(18, 7, 2010), 17);
        builder.make_branch(BRANCH_11, 4, t(18, 7, 2010), 8);
        builder.make_root(4, t(18, 7, 2010), &[(4, "/00/12"), (4, "/00/11"), (2, "/00/10")]);

        builder.make_branch(BRANCH_13, 5, t(16, 11, 2014), 25);
        builder.make_root(
            5,
            t(16, 11, 2014),
            &[(5, "/00/13"), (2, "/00/10"), (4, "/00/11"), (4, "/00/12")],
        );

        builder.make_root(6, t(17, 11, 2014), &[(4, "/00/11"), (4, "/00/12"), (5, "/00/13")]);

        let fixture = Self {
            repo: builder.repo,
            ids: builder.ids,
        };

        fixture.repo.set_head(fixture.root_hash(6));
        fixture.repo.set_history(fixture.build_history());
        fixture
    }

    pub fn root_hash(&self, revision: u32) -> ObjectId {
        self.catalog_hash(revision, "")
    }

    pub fn catalog_hash(&self, revision: u32, path: &str) -> ObjectId {
        self.ids[&(revision, path.to_string())]
    }

    /// Total number of distinct catalogs in the fixture
    pub fn catalog_count(&self) -> usize {
        self.ids.len()
    }

    fn build_history(&self) -> InMemoryHistory {
        let mut history = InMemoryHistory::new();
        history.begin_transaction().unwrap();
        for (name, revision, size, description) in [
            ("Revision2", 2u32, 1337u64, "this is revision 2"),
            ("Revision5", 5, 42, "this is revision 5"),
            ("Revision6", 6, 7, "this is revision 6 - the newest!"),
        ] {
            history
                .insert(SnapshotTag {
                    name: name.into(),
                    root_hash: self.root_hash(revision),
                    size,
                    revision,
                    timestamp: self.repo.catalog(&self.root_hash(revision)).unwrap().timestamp,
                    description: description.into(),
                    channel: String::new(),
                })
                .unwrap();
        }
        history.commit_transaction().unwrap();
        history
    }
}

struct Builder {
    repo: MockRepository,
    ids: HashMap<(u32, String), ObjectId>,
}

impl Builder {
    fn id(&mut self, revision: u32, path: &str) -> ObjectId {
        *self
            .ids
            .entry((revision, path.to_string()))
            .or_insert_with(|| synthetic_id(seed(revision, path)))
    }

    /// Register all catalogs of one branch for one revision
    fn make_branch(&mut self, branch: BranchLayout, revision: u32, base_ts: i64, ts_offset: i64) {
        for (index, (path, children)) in branch.iter().enumerate() {
            let hash = self.id(revision, path);
            let nested = children
                .iter()
                .map(|child| NestedEntry {
                    hash: self.id(revision, child),
                    mount_path: (*child).to_string(),
                })
                .collect();

            let parent = parent_path(path);
            let parent_hash = Some(self.id(revision, parent));
            // a recreated mount point links back to its previous revision
            let previous_hash = self
                .ids
                .get(&(revision - 1, path.to_string()))
                .copied();

            self.repo.insert_catalog(Catalog {
                hash,
                mount_path: (*path).to_string(),
                revision,
                timestamp: base_ts + ts_offset + index as i64,
                parent_hash,
                previous_hash,
                nested,
            });
        }
    }

    /// Register a revision root with the given nested branch heads
    fn make_root(&mut self, revision: u32, timestamp: i64, nested: &[(u32, &str)]) {
        let hash = self.id(revision, "");
        let previous_hash = if revision > 1 {
            Some(self.id(revision - 1, ""))
        } else {
            None
        };
        let nested = nested
            .iter()
            .map(|(child_revision, path)| NestedEntry {
                hash: self.id(*child_revision, path),
                mount_path: (*path).to_string(),
            })
            .collect();

        self.repo.insert_catalog(Catalog {
            hash,
            mount_path: String::new(),
            revision,
            timestamp,
            parent_hash: None,
            previous_hash,
            nested,
        });
    }
}

fn seed(revision: u32, path: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325 ^ (revision as u64);
    for byte in path.as_bytes() {
        h ^= *byte as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// Catalog-tree parent of a mount path ("" for branch heads)
fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        // branch heads like "/00/10" hang directly below the root
        Some(_) if path.matches('/').count() <= 2 => "",
        Some(pos) => &path[..pos],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// expected emission sequences

pub fn idents(revision: u32, paths: &[&str]) -> Vec<Identifier> {
    paths.iter().map(|p| (revision, (*p).to_string())).collect()
}

/// Pre-order emission of one branch (children in reverse declared order)
pub fn bfs_branch(branch: &str, revision: u32) -> Vec<Identifier> {
    match branch {
        "/00/10" => idents(
            revision,
            &[
                "/00/10",
                "/00/10/21",
                "/00/10/20",
                "/00/10/20/32",
                "/00/10/20/31",
                "/00/10/20/30",
                "/00/10/20/30/40",
            ],
        ),
        "/00/11" => idents(
            revision,
            &[
                "/00/11",
                "/00/11/24",
                "/00/11/23",
                "/00/11/22",
                "/00/11/22/34",
                "/00/11/22/34/43",
                "/00/11/22/34/42",
                "/00/11/22/34/41",
                "/00/11/22/33",
            ],
        ),
        "/00/12" => idents(
            revision,
            &[
                "/00/12",
                "/00/12/27",
                "/00/12/26",
                "/00/12/26/38",
                "/00/12/26/37",
                "/00/12/26/36",
                "/00/12/26/35",
                "/00/12/25",
            ],
        ),
        "/00/13" => idents(revision, &["/00/13", "/00/13/29", "/00/13/28"]),
        other => panic!("unknown branch {}", other),
    }
}

/// Post-order emission of one branch
pub fn dfs_branch(branch: &str, revision: u32) -> Vec<Identifier> {
    match branch {
        "/00/10" => idents(
            revision,
            &[
                "/00/10/21",
                "/00/10/20/32",
                "/00/10/20/31",
                "/00/10/20/30/40",
                "/00/10/20/30",
                "/00/10/20",
                "/00/10",
            ],
        ),
        "/00/11" => idents(
            revision,
            &[
                "/00/11/24",
                "/00/11/23",
                "/00/11/22/34/43",
                "/00/11/22/34/42",
                "/00/11/22/34/41",
                "/00/11/22/34",
                "/00/11/22/33",
                "/00/11/22",
                "/00/11",
            ],
        ),
        "/00/12" => idents(
            revision,
            &[
                "/00/12/27",
                "/00/12/26/38",
                "/00/12/26/37",
                "/00/12/26/36",
                "/00/12/26/35",
                "/00/12/26",
                "/00/12/25",
                "/00/12",
            ],
        ),
        "/00/13" => idents(revision, &["/00/13/29", "/00/13/28", "/00/13"]),
        other => panic!("unknown branch {}", other),
    }
}

/// Full pre-order emission of one revision tree (no history edge)
pub fn bfs_rev_tree(revision: u32) -> Vec<Identifier> {
    let mut out = vec![(revision, String::new())];
    match revision {
        1 => {}
        2 => out.extend(bfs_branch("/00/10", 2)),
        3 => {
            out.extend(bfs_branch("/00/10", 2));
            out.extend(bfs_branch("/00/11", 3));
        }
        4 => {
            out.extend(bfs_branch("/00/10", 2));
            out.extend(bfs_branch("/00/11", 4));
            out.extend(bfs_branch("/00/12", 4));
        }
        5 => {
            out.extend(bfs_branch("/00/12", 4));
            out.extend(bfs_branch("/00/11", 4));
            out.extend(bfs_branch("/00/10", 2));
            out.extend(bfs_branch("/00/13", 5));
        }
        6 => {
            out.extend(bfs_branch("/00/13", 5));
            out.extend(bfs_branch("/00/12", 4));
            out.extend(bfs_branch("/00/11", 4));
        }
        other => panic!("unknown revision {}", other),
    }
    out
}

/// Full post-order emission of one revision tree (no history edge)
pub fn dfs_rev_tree(revision: u32) -> Vec<Identifier> {
    let mut out = Vec::new();
    match revision {
        1 => {}
        2 => out.extend(dfs_branch("/00/10", 2)),
        3 => {
            out.extend(dfs_branch("/00/10", 2));
            out.extend(dfs_branch("/00/11", 3));
        }
        4 => {
            out.extend(dfs_branch("/00/10", 2));
            out.extend(dfs_branch("/00/11", 4));
            out.extend(dfs_branch("/00/12", 4));
        }
        5 => {
            out.extend(dfs_branch("/00/12", 4));
            out.extend(dfs_branch("/00/11", 4));
            out.extend(dfs_branch("/00/10", 2));
            out.extend(dfs_branch("/00/13", 5));
        }
        6 => {
            out.extend(dfs_branch("/00/13", 5));
            out.extend(dfs_branch("/00/12", 4));
            out.extend(dfs_branch("/00/11", 4));
        }
        other => panic!("unknown revision {}", other),
    }
    out.push((revision, String::new()));
    out
}

pub fn concat(parts: &[Vec<Identifier>]) -> Vec<Identifier> {
    parts.iter().flatten().cloned().collect()
}

// ---------------------------------------------------------------------------
// recording and property checks

/// A listener that records `(revision, mount_path)` per emission
pub fn recorder() -> (
    Arc<Mutex<Vec<Identifier>>>,
    impl FnMut(&CatalogVisit) + Send + 'static,
) {
    let log: Arc<Mutex<Vec<Identifier>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let listener = move |visit: &CatalogVisit| {
        sink.lock()
            .push((visit.catalog.revision, visit.catalog.mount_path.clone()));
    };
    (log, listener)
}

/// Assert the exact emission sequence
pub fn check_sequence(expected: &[Identifier], observed: &[Identifier]) {
    assert_eq!(
        expected.len(),
        observed.len(),
        "emission count changed: expected {}, got {}",
        expected.len(),
        observed.len()
    );
    for (index, (expected, observed)) in expected.iter().zip(observed.iter()).enumerate() {
        assert_eq!(
            expected, observed,
            "traversal order changed at index {}",
            index
        );
    }
}

/// Assert multiset equality regardless of order
pub fn check_same_emissions(expected: &[Identifier], observed: &[Identifier]) {
    let mut expected = expected.to_vec();
    let mut observed = observed.to_vec();
    expected.sort();
    observed.sort();
    assert_eq!(expected, observed, "emission multiset changed");
}

/// Mount-path parent in the same revision, as used by the order checks
/// (branch heads resolve to "/00", which is never a catalog, so they are
/// unconstrained)
fn check_parent(identifier: &Identifier) -> Option<Identifier> {
    let (revision, path) = identifier;
    path.rfind('/')
        .map(|pos| (*revision, path[..pos].to_string()))
}

/// Post-order property: no catalog may appear after its mount-path parent
/// of the same revision
pub fn post_order_holds(observed: &[Identifier]) -> bool {
    let mut seen: HashSet<&Identifier> = HashSet::new();
    for identifier in observed {
        if !identifier.1.is_empty() {
            if let Some(parent) = check_parent(identifier) {
                if seen.contains(&parent) {
                    return false;
                }
            }
        }
        seen.insert(identifier);
    }
    true
}

/// Pre-order property: every emitted catalog whose mount-path parent of
/// the same revision is emitted at all must come after some emission of
/// that parent
pub fn pre_order_holds(observed: &[Identifier]) -> bool {
    let all: HashSet<&Identifier> = observed.iter().collect();
    let mut seen: HashSet<&Identifier> = HashSet::new();
    for identifier in observed {
        if !identifier.1.is_empty() {
            if let Some(parent) = check_parent(identifier) {
                if all.contains(&parent) && !seen.contains(&parent) {
                    return false;
                }
            }
        }
        seen.insert(identifier);
    }
    true
}
