//! Index metadata stored in the header page (page 0).
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       8     PageHeader (IndexMeta)
//! 8       20    relation name, NUL padded
//! 28      4     attribute byte offset (u32)
//! 32      1     attribute type (u8)
//! 33      3     reserved
//! 36      4     root page id (u32)
//! 40      2     leaf capacity (u16)
//! 42      2     internal capacity (u16)
//! ```

use crate::common::config::{INTERNAL_MAX_KEYS, LEAF_MAX_ENTRIES, RELATION_NAME_MAX};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

const OFFSET_RELATION: usize = PageHeader::SIZE;
const OFFSET_ATTR_OFFSET: usize = OFFSET_RELATION + RELATION_NAME_MAX;
const OFFSET_ATTR_TYPE: usize = OFFSET_ATTR_OFFSET + 4;
const OFFSET_ROOT: usize = 36;
const OFFSET_LEAF_CAPACITY: usize = 40;
const OFFSET_INTERNAL_CAPACITY: usize = 42;

/// Type of the indexed attribute.
///
/// Only [`AttrType::Integer`] keys can be indexed; the other variants exist
/// so an index file and its error messages can name the attribute type.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    Integer = 0,
    Double = 1,
    String = 2,
}

impl AttrType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AttrType::Integer),
            1 => Some(AttrType::Double),
            2 => Some(AttrType::String),
            _ => None,
        }
    }
}

/// The singleton metadata record of an index.
///
/// Everything but `root_page` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    pub relation_name: String,
    pub attr_offset: u32,
    pub attr_type: AttrType,
    pub root_page: PageId,
    pub leaf_capacity: u16,
    pub internal_capacity: u16,
}

impl IndexMeta {
    /// Whether this record describes the requested relation attribute.
    pub fn matches(&self, relation_name: &str, attr_offset: u32, attr_type: AttrType) -> bool {
        self.relation_name == relation_name
            && self.attr_offset == attr_offset
            && self.attr_type == attr_type
    }

    /// Decode the header page.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if the page is not a header page or any field
    /// is out of range.
    pub fn from_page(page: &Page) -> Result<Self> {
        let corrupted = |reason: String| Error::corrupted(PageId::HEADER, reason);

        let header = page.header();
        if header.page_type != PageType::IndexMeta {
            return Err(corrupted(format!(
                "expected index header page, found {:?}",
                header.page_type
            )));
        }

        let data = page.as_slice();
        let name_bytes = &data[OFFSET_RELATION..OFFSET_ATTR_OFFSET];
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(RELATION_NAME_MAX);
        let relation_name = std::str::from_utf8(&name_bytes[..name_len])
            .map_err(|_| corrupted("relation name is not UTF-8".into()))?
            .to_string();

        let attr_offset = page.read_u32(OFFSET_ATTR_OFFSET);
        let attr_type = AttrType::from_u8(data[OFFSET_ATTR_TYPE]).ok_or_else(|| {
            corrupted(format!("unknown attribute type {}", data[OFFSET_ATTR_TYPE]))
        })?;
        let root_page = page
            .read_link(OFFSET_ROOT)
            .filter(|&pid| pid != PageId::HEADER)
            .ok_or_else(|| corrupted("root page id is not a tree page".into()))?;

        let leaf_capacity = page.read_u16(OFFSET_LEAF_CAPACITY);
        let internal_capacity = page.read_u16(OFFSET_INTERNAL_CAPACITY);
        if !(2..=LEAF_MAX_ENTRIES).contains(&(leaf_capacity as usize))
            || !(2..=INTERNAL_MAX_KEYS).contains(&(internal_capacity as usize))
        {
            return Err(corrupted(format!(
                "stored capacities {}/{} out of range",
                leaf_capacity, internal_capacity
            )));
        }

        Ok(Self {
            relation_name,
            attr_offset,
            attr_type,
            root_page,
            leaf_capacity,
            internal_capacity,
        })
    }

    /// Encode into the header page.
    ///
    /// # Panics
    /// Panics if the relation name is longer than `RELATION_NAME_MAX` bytes.
    pub fn write_to(&self, page: &mut Page) {
        let name = self.relation_name.as_bytes();
        assert!(name.len() <= RELATION_NAME_MAX, "relation name too long");

        page.reset();
        page.set_header(&PageHeader::meta());

        let data = page.as_mut_slice();
        data[OFFSET_RELATION..OFFSET_RELATION + name.len()].copy_from_slice(name);
        data[OFFSET_ATTR_TYPE] = self.attr_type as u8;

        page.write_u32(OFFSET_ATTR_OFFSET, self.attr_offset);
        page.write_link(OFFSET_ROOT, Some(self.root_page));
        page.write_u16(OFFSET_LEAF_CAPACITY, self.leaf_capacity);
        page.write_u16(OFFSET_INTERNAL_CAPACITY, self.internal_capacity);
    }
}
