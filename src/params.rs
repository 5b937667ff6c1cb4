//! Traversal parameters
//!
//! Runtime knobs shared by both drivers. The library keeps this a plain
//! struct; the CLI maps its flags onto it.

use crate::error::ConfigError;

/// Follow previous-revision edges without bound
pub const FULL_HISTORY: u32 = u32::MAX;

/// Emission order of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Pre-order: a parent is emitted before any of its descendants in the
    /// same revision; newer revisions before older ones
    #[default]
    BreadthFirst,

    /// Post-order: a parent is emitted after all of its descendants in the
    /// same revision; older revisions before newer ones
    DepthFirst,
}

/// Parameters steering a traversal driver
#[derive(Debug, Clone)]
pub struct TraversalParams {
    /// Maximum number of previous-revision edges to follow;
    /// `0` visits only the entry revision, [`FULL_HISTORY`] is unbounded
    pub history_depth: u32,

    /// Roots strictly older than this epoch timestamp stop the history
    /// chain (the root itself is still emitted); `0` disables the floor
    pub timestamp_floor: i64,

    /// Emit every catalog hash at most once across all entry points
    pub no_repeat_history: bool,

    /// Treat a catalog that fails to load as a leaf (prune its subtree)
    /// instead of aborting the traversal
    pub ignore_load_failure: bool,

    /// Keep emitted catalogs in the retained list instead of releasing
    /// them after the listener fanout
    pub no_close: bool,

    /// Suppress the drivers' diagnostic output
    pub quiet: bool,

    /// Worker threads; 1 selects the sequential driver in the CLI
    pub num_threads: usize,

    /// High-water mark of the parallel frontier
    pub frontier_capacity: usize,
}

impl Default for TraversalParams {
    fn default() -> Self {
        Self {
            history_depth: 0,
            timestamp_floor: 0,
            no_repeat_history: false,
            ignore_load_failure: false,
            no_close: false,
            quiet: false,
            num_threads: 1,
            frontier_capacity: 4096,
        }
    }
}

impl TraversalParams {
    /// Validate thread count and frontier sizing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::InvalidThreadCount {
                count: self.num_threads,
            });
        }
        if self.frontier_capacity < self.num_threads {
            return Err(ConfigError::InvalidFrontierCapacity {
                capacity: self.frontier_capacity,
                min: self.num_threads,
            });
        }
        Ok(())
    }
}
