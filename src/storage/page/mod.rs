//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`PageHeader`] - Self-description at the start of every page
//! - [`PageType`] - Discriminator for header, internal and leaf pages

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::Page;
pub use page_header::{PageHeader, PageType, LEAF_LEVEL};
