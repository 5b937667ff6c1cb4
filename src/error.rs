//! Error types for catalog-walker
//!
//! This module defines the error hierarchy that covers:
//! - Object fetch failures (not found, transport, decode)
//! - History database failures
//! - Traversal invariant violations
//! - Configuration errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Keep the policy decision (ignorable vs. fatal) next to the error
//! - Preserve the failure kind for logging even when it is ignored
//!
//! Policy cutoffs (history depth, timestamp floor) are never reported as
//! errors; they are expressed by omission from the emission stream.

use crate::hash::ObjectId;
use thiserror::Error;

/// Top-level error type for the catalog-walker library
#[derive(Error, Debug)]
pub enum WalkError {
    /// Object fetch failures
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// History database failures
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// A fetched catalog disagrees with the reference that requested it
    #[error("catalog {hash} does not match its reference: {detail}")]
    InvariantViolation { hash: ObjectId, detail: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (worker spawn, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the object fetcher contract
///
/// `NotFound` and `Transport` are governed by the `ignore_load_failure`
/// parameter; `Decode` is always fatal.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The fetcher cannot locate the object
    #[error("not found: {object}")]
    NotFound { object: String },

    /// Network or storage failure during fetch
    #[error("transport failure while fetching {object}: {reason}")]
    Transport { object: String, reason: String },

    /// Fetched bytes are not a valid object
    #[error("failed to decode {object}: {reason}")]
    Decode { object: String, reason: String },
}

impl FetchError {
    /// Check if this failure may be downgraded to a skip
    /// (`ignore_load_failure` policy)
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound { .. } | FetchError::Transport { .. }
        )
    }

    /// Shorthand for a missing object identified by hash
    pub fn not_found(hash: &ObjectId) -> Self {
        FetchError::NotFound {
            object: hash.to_string(),
        }
    }
}

/// History database errors
#[derive(Error, Debug, Clone)]
pub enum HistoryError {
    /// Backend failure (storage, corruption, ...)
    #[error("history backend error: {0}")]
    Backend(String),

    /// Tag name already present
    #[error("tag '{name}' already exists")]
    DuplicateTag { name: String },

    /// Write attempted outside a transaction
    #[error("no open transaction")]
    NoTransaction,
}

/// Configuration errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Invalid worker count for the parallel driver
    #[error("invalid thread count {count}: must be at least 1")]
    InvalidThreadCount { count: usize },

    /// Invalid frontier capacity
    #[error("invalid frontier capacity {capacity}: must be at least {min}")]
    InvalidFrontierCapacity { capacity: usize, min: usize },
}

/// Object identifier parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Digest has the wrong number of hex characters
    #[error("digest must be {expected} hex characters, got {actual}")]
    BadLength { expected: usize, actual: usize },

    /// Non-hex character in the digest
    #[error("invalid hex digit '{0}'")]
    BadHex(char),

    /// Unknown object-type suffix
    #[error("unknown object suffix '{0}'")]
    BadSuffix(char),
}

/// Errors loading a repository image file
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error reading the image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image is not valid JSON (including malformed object identifiers)
    #[error("invalid repository image: {0}")]
    Parse(#[from] serde_json::Error),

    /// Tag list could not be turned into a history database
    #[error("invalid tag list: {0}")]
    History(#[from] HistoryError),

    /// The image references an object it does not contain
    #[error("image references missing object {hash}")]
    MissingObject { hash: ObjectId },
}

/// Result type alias for WalkError
pub type Result<T> = std::result::Result<T, WalkError>;

/// Result type alias for FetchError
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for HistoryError
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
