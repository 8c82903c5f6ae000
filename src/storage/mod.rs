//! Storage layer - index file I/O and page formats.
//!
//! - [`DiskManager`] - Page-granular file I/O
//! - [`page`] - Raw pages and their self-describing header

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
