//! Repository images
//!
//! A repository image is a JSON snapshot of a repository's catalog
//! metadata: the manifest HEAD, every catalog record, and the tag list.
//! The CLI scans images offline; integrity tooling exports them from live
//! repositories.
//!
//! Object payloads are not part of an image, only the metadata the
//! traversal engine consumes.

use crate::catalog::{Catalog, CatalogRef};
use crate::error::{FetchError, FetchResult, StoreError};
use crate::fetcher::ObjectFetcher;
use crate::hash::ObjectId;
use crate::history::{HistoryProvider, InMemoryHistory, SnapshotTag, WritableHistory};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk snapshot of a repository's catalog metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryImage {
    /// Root catalog of the newest revision (the manifest entry)
    pub head: Option<ObjectId>,

    /// Every catalog record in the image
    #[serde(default)]
    pub catalogs: Vec<Catalog>,

    /// Named snapshots, in insertion order
    #[serde(default)]
    pub tags: Vec<SnapshotTag>,
}

impl RepositoryImage {
    /// Read an image from a JSON file
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the image as JSON
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Check that the traversal entry points resolve within the image
    ///
    /// Only the HEAD and the tag roots are checked: dangling nested or
    /// previous-revision pointers are legitimate in partially garbage
    /// collected repositories and are exactly what a tolerant traversal
    /// reports.
    pub fn verify(&self) -> Result<(), StoreError> {
        let known: HashSet<ObjectId> = self.catalogs.iter().map(|c| c.hash).collect();

        if let Some(head) = self.head {
            if !known.contains(&head) {
                return Err(StoreError::MissingObject { hash: head });
            }
        }
        for tag in &self.tags {
            if !known.contains(&tag.root_hash) {
                return Err(StoreError::MissingObject {
                    hash: tag.root_hash,
                });
            }
        }
        Ok(())
    }

    /// Turn the image into a fetcher the traversal drivers can use
    pub fn into_fetcher(self) -> Result<ImageFetcher, StoreError> {
        let mut history = InMemoryHistory::new();
        history.begin_transaction()?;
        for tag in self.tags {
            history.insert(tag)?;
        }
        history.commit_transaction()?;

        Ok(ImageFetcher {
            catalogs: self
                .catalogs
                .into_iter()
                .map(|c| (c.hash, c))
                .collect(),
            head: self.head,
            history,
        })
    }
}

/// Object fetcher backed by a loaded repository image
pub struct ImageFetcher {
    catalogs: HashMap<ObjectId, Catalog>,
    head: Option<ObjectId>,
    history: InMemoryHistory,
}

impl ImageFetcher {
    /// Number of catalogs in the image
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

impl ObjectFetcher for ImageFetcher {
    fn fetch_catalog(&self, reference: &CatalogRef) -> FetchResult<Catalog> {
        self.catalogs
            .get(&reference.hash)
            .cloned()
            .ok_or_else(|| FetchError::not_found(&reference.hash))
    }

    fn fetch_manifest(&self) -> FetchResult<ObjectId> {
        self.head.ok_or(FetchError::NotFound {
            object: "manifest".into(),
        })
    }

    fn fetch_history(&self) -> FetchResult<Box<dyn HistoryProvider>> {
        Ok(Box::new(self.history.clone()))
    }
}
