//! Disk-backed B+Tree secondary index over `i32` keys.
//!
//! # Components
//! - [`node`] - Leaf/internal page codec
//! - [`meta`] - Header page metadata ([`IndexMeta`], [`AttrType`])
//! - `insert` - Recursive insertion with split propagation
//! - `scan` - Range scan state machine ([`Operator`], [`ScanIter`])
//! - `verify` - Structural invariant checker ([`TreeShape`])
//!
//! # File layout
//! ```text
//! ┌──────────┬──────────┬─────────┬─────────┐
//! │ Page 0   │ Page 1   │ Page 2  │  ...    │
//! │ IndexMeta│ first    │ leaves and internal │
//! │          │ root leaf│ nodes, any order    │
//! └──────────┴──────────┴─────────┴─────────┘
//! ```

mod insert;
pub mod meta;
pub mod node;
mod scan;
mod verify;

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::buffer::BufferPoolManager;
use crate::common::config::RELATION_NAME_MAX;
use crate::common::{Error, IndexConfig, PageId, Result};
use crate::relation::{Record, RecordSource};
use crate::storage::DiskManager;

pub use meta::{AttrType, IndexMeta};
pub use node::{InternalNode, LeafEntry, LeafNode, LeafView, Node};
pub use scan::{Operator, ScanIter};
pub use verify::TreeShape;

use scan::ScanState;

/// A B+Tree index over one integer attribute of one relation.
///
/// The index owns its file and a private buffer pool. It is single-threaded:
/// operations take `&mut self` and run to completion.
///
/// # Example
/// ```no_run
/// use badger_btree::{AttrType, BTreeIndex, IndexConfig, MemoryRelation, Operator};
///
/// let config = IndexConfig::new("/tmp/indexes");
/// let mut relation = MemoryRelation::from_keys(0, 0..100);
/// let mut index =
///     BTreeIndex::open_or_create(&config, "emp", 0, AttrType::Integer, &mut relation)?;
///
/// index.start_scan(10, Operator::Gte, 20, Operator::Lt)?;
/// while let Ok(rid) = index.scan_next() {
///     println!("{}", rid);
/// }
/// index.end_scan()?;
/// index.close()?;
/// # Ok::<(), badger_btree::Error>(())
/// ```
pub struct BTreeIndex {
    bpm: BufferPoolManager,
    meta: IndexMeta,
    index_name: String,
    path: PathBuf,
    scan: ScanState,
    closed: bool,
}

impl BTreeIndex {
    /// Open the index for `(relation_name, attr_offset, attr_type)`, building
    /// it from `source` if no index file exists yet.
    ///
    /// The file is named `"<relation_name>.<attr_offset>"` inside
    /// `config.index_dir`. Capacities in `config` only apply when the index
    /// is created; a reopened index uses the ones stored in its header page.
    ///
    /// # Errors
    /// - `Error::IndexMismatch` if the existing file was built for a
    ///   different relation, offset or type
    /// - `Error::UnsupportedAttrType` for anything but `AttrType::Integer`
    /// - `Error::InvalidConfig` for a bad configuration or relation name
    /// - `Error::RecordTooShort` if a source record cannot hold the key
    pub fn open_or_create<S: RecordSource + ?Sized>(
        config: &IndexConfig,
        relation_name: &str,
        attr_offset: usize,
        attr_type: AttrType,
        source: &mut S,
    ) -> Result<Self> {
        config.validate()?;

        if attr_type != AttrType::Integer {
            return Err(Error::UnsupportedAttrType(attr_type));
        }
        if relation_name.is_empty()
            || relation_name.len() > RELATION_NAME_MAX
            || relation_name.contains('\0')
        {
            return Err(Error::InvalidConfig(format!(
                "relation name {:?} must be 1..={} bytes without NUL",
                relation_name, RELATION_NAME_MAX
            )));
        }
        let attr_offset = u32::try_from(attr_offset).map_err(|_| {
            Error::InvalidConfig(format!("attribute offset {} too large", attr_offset))
        })?;

        let index_name = format!("{}.{}", relation_name, attr_offset);
        let path = config.index_dir.join(&index_name);

        if DiskManager::exists(&path) {
            Self::open(config, relation_name, attr_offset, attr_type, index_name, path)
        } else {
            Self::create(
                config,
                relation_name,
                attr_offset,
                attr_type,
                index_name,
                path,
                source,
            )
        }
    }

    fn open(
        config: &IndexConfig,
        relation_name: &str,
        attr_offset: u32,
        attr_type: AttrType,
        index_name: String,
        path: PathBuf,
    ) -> Result<Self> {
        let bpm = BufferPoolManager::new(config.pool_size, DiskManager::open(&path)?);

        let meta = {
            let guard = bpm.fetch_page_read(PageId::HEADER)?;
            IndexMeta::from_page(&guard)?
        };

        if !meta.matches(relation_name, attr_offset, attr_type) {
            return Err(Error::IndexMismatch {
                stored_relation: meta.relation_name,
                stored_offset: meta.attr_offset,
                stored_type: meta.attr_type,
                requested_relation: relation_name.to_string(),
                requested_offset: attr_offset,
                requested_type: attr_type,
            });
        }

        info!(index = %index_name, root = %meta.root_page, "opened index");

        Ok(Self {
            bpm,
            meta,
            index_name,
            path,
            scan: ScanState::Idle,
            closed: false,
        })
    }

    fn create<S: RecordSource + ?Sized>(
        config: &IndexConfig,
        relation_name: &str,
        attr_offset: u32,
        attr_type: AttrType,
        index_name: String,
        path: PathBuf,
        source: &mut S,
    ) -> Result<Self> {
        let bpm = BufferPoolManager::new(config.pool_size, DiskManager::create(&path)?);

        let meta = {
            let mut header = bpm.new_page()?;
            if header.page_id() != PageId::HEADER {
                return Err(Error::corrupted(
                    header.page_id(),
                    "new index file did not start empty",
                ));
            }

            let mut root = bpm.new_page()?;
            LeafNode::new().write_to(&mut root);

            let meta = IndexMeta {
                relation_name: relation_name.to_string(),
                attr_offset,
                attr_type,
                root_page: root.page_id(),
                leaf_capacity: config.leaf_capacity as u16,
                internal_capacity: config.internal_capacity as u16,
            };
            meta.write_to(&mut header);
            meta
        };

        info!(
            index = %index_name,
            leaf_capacity = meta.leaf_capacity,
            internal_capacity = meta.internal_capacity,
            "created index"
        );

        let mut index = Self {
            bpm,
            meta,
            index_name,
            path,
            scan: ScanState::Idle,
            closed: false,
        };

        if let Err(e) = index.bulk_load(source) {
            // A half-built file would be reopened as if complete.
            let path = index.path.clone();
            drop(index);
            if let Err(remove_err) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %remove_err, "failed to remove partial index");
            }
            return Err(e);
        }

        Ok(index)
    }

    fn bulk_load<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let mut loaded = 0u64;
        while let Some(record) = source.next_record()? {
            let key = self.extract_key(&record)?;
            self.insert(key, record.rid)?;
            loaded += 1;
        }

        info!(index = %self.index_name, records = loaded, "bulk load complete");
        Ok(())
    }

    /// Read the little-endian `i32` key at the indexed attribute offset.
    fn extract_key(&self, record: &Record) -> Result<i32> {
        let start = self.meta.attr_offset as usize;
        record
            .data
            .get(start..start + 4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or(Error::RecordTooShort {
                rid: record.rid,
                len: record.data.len(),
                offset: self.meta.attr_offset,
            })
    }

    /// Persist the header page after the root changed.
    fn write_meta(&self) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(PageId::HEADER)?;
        self.meta.write_to(&mut guard);
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// File name of the index, `"<relation>.<offset>"`.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn root_page_id(&self) -> PageId {
        self.meta.root_page
    }

    pub fn leaf_capacity(&self) -> usize {
        self.meta.leaf_capacity as usize
    }

    pub fn internal_capacity(&self) -> usize {
        self.meta.internal_capacity as usize
    }

    /// The index's private buffer pool.
    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.bpm
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Write every dirty page back and sync the index file.
    pub fn flush(&self) -> Result<()> {
        self.bpm.flush_all_pages()
    }

    /// End any active scan and flush the index.
    ///
    /// Dropping the index does the same but can only log a failed flush.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.scan.is_active() {
            self.scan = ScanState::Idle;
            debug!(index = %self.index_name, "ended active scan at close");
        }
        self.flush()?;
        info!(index = %self.index_name, "closed index");
        Ok(())
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.shutdown() {
            warn!(index = %self.index_name, error = %e, "failed to flush index on drop");
        }
    }
}

impl std::fmt::Debug for BTreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTreeIndex")
            .field("index_name", &self.index_name)
            .field("meta", &self.meta)
            .field("scan", &self.scan)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RecordId;
    use crate::relation::MemoryRelation;
    use tempfile::tempdir;

    fn small_config(dir: &std::path::Path) -> IndexConfig {
        IndexConfig::new(dir)
            .with_pool_size(16)
            .with_leaf_capacity(4)
            .with_internal_capacity(4)
    }

    #[test]
    fn test_create_names_file_after_relation_and_offset() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::from_keys(4, 0..10);

        let index =
            BTreeIndex::open_or_create(&small_config(dir.path()), "emp", 4, AttrType::Integer, &mut rel)
                .unwrap();

        assert_eq!(index.index_name(), "emp.4");
        assert!(dir.path().join("emp.4").is_file());
        assert_eq!(index.meta().relation_name, "emp");
        assert_eq!(index.leaf_capacity(), 4);
    }

    #[test]
    fn test_empty_relation_has_leaf_root_at_page_one() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::new();

        let index =
            BTreeIndex::open_or_create(&small_config(dir.path()), "emp", 0, AttrType::Integer, &mut rel)
                .unwrap();

        assert_eq!(index.root_page_id(), PageId::new(1));
        assert_eq!(index.buffer_pool().disk_page_count(), 2);
    }

    #[test]
    fn test_unsupported_attr_type() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::new();

        let err =
            BTreeIndex::open_or_create(&small_config(dir.path()), "emp", 0, AttrType::Double, &mut rel)
                .unwrap_err();

        assert!(matches!(err, Error::UnsupportedAttrType(AttrType::Double)));
        assert!(!dir.path().join("emp.0").exists());
    }

    #[test]
    fn test_relation_name_too_long() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::new();
        let name = "x".repeat(RELATION_NAME_MAX + 1);

        let err =
            BTreeIndex::open_or_create(&small_config(dir.path()), &name, 0, AttrType::Integer, &mut rel)
                .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_short_record_removes_partial_file() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::new();
        rel.push(RecordId::new(1, 0), vec![0u8; 6]);

        let err =
            BTreeIndex::open_or_create(&small_config(dir.path()), "emp", 4, AttrType::Integer, &mut rel)
                .unwrap_err();

        assert!(matches!(err, Error::RecordTooShort { len: 6, offset: 4, .. }));
        assert!(!dir.path().join("emp.4").exists());
    }

    #[test]
    fn test_reopen_keeps_stored_capacities() {
        let dir = tempdir().unwrap();
        let mut rel = MemoryRelation::from_keys(0, 0..50);

        let index =
            BTreeIndex::open_or_create(&small_config(dir.path()), "emp", 0, AttrType::Integer, &mut rel)
                .unwrap();
        let root = index.root_page_id();
        index.close().unwrap();

        let config = IndexConfig::new(dir.path()).with_pool_size(16);
        let index =
            BTreeIndex::open_or_create(&config, "emp", 0, AttrType::Integer, &mut MemoryRelation::new())
                .unwrap();

        assert_eq!(index.leaf_capacity(), 4);
        assert_eq!(index.internal_capacity(), 4);
        assert_eq!(index.root_page_id(), root);
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempdir().unwrap();
        {
            let mut rel = MemoryRelation::from_keys(0, 0..20);
            let _index = BTreeIndex::open_or_create(
                &small_config(dir.path()),
                "emp",
                0,
                AttrType::Integer,
                &mut rel,
            )
            .unwrap();
        }

        let index = BTreeIndex::open_or_create(
            &small_config(dir.path()),
            "emp",
            0,
            AttrType::Integer,
            &mut MemoryRelation::new(),
        )
        .unwrap();
        assert_eq!(index.verify().unwrap().entry_count, 20);
    }
}
