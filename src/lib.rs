//! badger-btree - a disk-backed B+Tree secondary index.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          BTreeIndex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   lifecycle · insert (split/grow) · scan · verify        │   │
//! │  │            node codec · header page metadata             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   BufferPoolManager + Frame + page guards + LRU          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │           DiskManager + Page + PageHeader                │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, config)
//! - [`storage`] - Index file I/O and page formats
//! - [`buffer`] - Buffer pool and eviction
//! - [`index`] - The B+Tree
//! - [`relation`] - Record sources used to build an index
//!
//! # Quick Start
//! ```no_run
//! use badger_btree::{AttrType, BTreeIndex, IndexConfig, MemoryRelation, Operator};
//!
//! let config = IndexConfig::new("/tmp");
//! let mut rel = MemoryRelation::from_keys(0, [1, 3, 5, 7, 9]);
//! let mut index = BTreeIndex::open_or_create(&config, "rel", 0, AttrType::Integer, &mut rel)?;
//!
//! for rid in index.scan(3, Operator::Gte, 7, Operator::Lte)? {
//!     println!("{}", rid?);
//! }
//! index.close()?;
//! # Ok::<(), badger_btree::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod relation;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, IndexConfig, PageId, RecordId, Result};

pub use buffer::BufferPoolManager;
pub use index::btree::{AttrType, BTreeIndex, IndexMeta, Operator, ScanIter, TreeShape};
pub use relation::{MemoryRelation, Record, RecordSource};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
