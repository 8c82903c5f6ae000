//! Index structures.
//!
//! - [`btree`] - Disk-backed B+Tree over `i32` keys

pub mod btree;

pub use btree::{AttrType, BTreeIndex, Operator, ScanIter, TreeShape};
