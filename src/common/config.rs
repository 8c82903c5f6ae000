//! Configuration constants and index construction options.

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every page of an index file (header, leaf, internal) is exactly this size.
pub const PAGE_SIZE: usize = 4096;

/// Largest leaf capacity a 4KB page can hold.
///
/// 8-byte page header + 4-byte right sibling, then 12-byte entries
/// (`i32` key, 6-byte record id, 2 bytes padding).
pub const LEAF_MAX_ENTRIES: usize = (PAGE_SIZE - 12) / 12;

/// Largest separator count an internal page can hold.
///
/// 8-byte page header + leading 4-byte child, then 8-byte `(key, child)` pairs.
pub const INTERNAL_MAX_KEYS: usize = (PAGE_SIZE - 12) / 8;

/// Bytes reserved for the relation name in the header page.
pub const RELATION_NAME_MAX: usize = 20;

/// Fewest frames an index will run with.
///
/// A split pins the node being split together with its new sibling.
pub const MIN_POOL_SIZE: usize = 8;

/// Default number of buffer pool frames per open index.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Options used when opening or creating an index.
///
/// `leaf_capacity` and `internal_capacity` only apply to newly created
/// indexes; an existing index keeps the capacities stored in its header page.
///
/// # Example
/// ```
/// use badger_btree::IndexConfig;
///
/// let config = IndexConfig::new("/tmp")
///     .with_pool_size(32)
///     .with_leaf_capacity(4)
///     .with_internal_capacity(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Directory holding index files.
    pub index_dir: PathBuf,
    /// Frames in the index's buffer pool.
    pub pool_size: usize,
    /// Maximum entries per leaf (`L`).
    pub leaf_capacity: usize,
    /// Maximum separator keys per internal node (`M`).
    pub internal_capacity: usize,
}

impl IndexConfig {
    /// Default configuration with index files placed in `index_dir`.
    pub fn new<P: AsRef<Path>>(index_dir: P) -> Self {
        Self {
            index_dir: index_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    pub fn with_internal_capacity(mut self, internal_capacity: usize) -> Self {
        self.internal_capacity = internal_capacity;
        self
    }

    /// Check capacities against the page layout and the pool against pinning needs.
    pub fn validate(&self) -> Result<()> {
        if !(2..=LEAF_MAX_ENTRIES).contains(&self.leaf_capacity) {
            return Err(Error::InvalidConfig(format!(
                "leaf capacity {} outside 2..={}",
                self.leaf_capacity, LEAF_MAX_ENTRIES
            )));
        }
        if !(2..=INTERNAL_MAX_KEYS).contains(&self.internal_capacity) {
            return Err(Error::InvalidConfig(format!(
                "internal capacity {} outside 2..={}",
                self.internal_capacity, INTERNAL_MAX_KEYS
            )));
        }
        if self.pool_size < MIN_POOL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "pool size {} below minimum {}",
                self.pool_size, MIN_POOL_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("."),
            pool_size: DEFAULT_POOL_SIZE,
            leaf_capacity: LEAF_MAX_ENTRIES,
            internal_capacity: INTERNAL_MAX_KEYS,
        }
    }
}
