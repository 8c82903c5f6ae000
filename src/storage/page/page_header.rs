//! Page header and type definitions.
//!
//! Every page of an index file starts with a [`PageHeader`] so that a raw
//! page can describe itself:
//! - [`PageType`] discriminator (header page, internal node, leaf)
//! - key count
//! - tree level (`LEAF_LEVEL` for leaves, height above the leaves for internal nodes)

/// Level value stored in every leaf page.
pub const LEAF_LEVEL: i32 = -1;

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Never written (a zeroed page) or unrecognized.
    #[default]
    Invalid = 0,
    /// The index header page holding the metadata record.
    IndexMeta = 1,
    /// B+Tree internal (non-leaf) node.
    BTreeInternal = 2,
    /// B+Tree leaf node.
    BTreeLeaf = 3,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::IndexMeta,
            2 => PageType::BTreeInternal,
            3 => PageType::BTreeLeaf,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       1     reserved
/// 2       2     key_count (little-endian)
/// 4       4     level (i32, little-endian)
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    /// Entries in a leaf, separator keys in an internal node.
    pub key_count: u16,
    pub level: i32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_KEY_COUNT: usize = 2;
    pub const OFFSET_LEVEL: usize = 4;

    /// Header for an empty leaf.
    pub fn leaf(key_count: u16) -> Self {
        Self {
            page_type: PageType::BTreeLeaf,
            key_count,
            level: LEAF_LEVEL,
        }
    }

    /// Header for an internal node at `level`.
    pub fn internal(key_count: u16, level: i32) -> Self {
        Self {
            page_type: PageType::BTreeInternal,
            key_count,
            level,
        }
    }

    /// Header for the index metadata page.
    pub fn meta() -> Self {
        Self {
            page_type: PageType::IndexMeta,
            key_count: 0,
            level: 0,
        }
    }

    /// Whether the level marker identifies a leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.level == LEAF_LEVEL
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let page_type = PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]);
        let key_count = u16::from_le_bytes([
            data[Self::OFFSET_KEY_COUNT],
            data[Self::OFFSET_KEY_COUNT + 1],
        ]);
        let level = i32::from_le_bytes([
            data[Self::OFFSET_LEVEL],
            data[Self::OFFSET_LEVEL + 1],
            data[Self::OFFSET_LEVEL + 2],
            data[Self::OFFSET_LEVEL + 3],
        ]);

        Self {
            page_type,
            key_count,
            level,
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_PAGE_TYPE + 1] = 0;
        data[Self::OFFSET_KEY_COUNT..Self::OFFSET_KEY_COUNT + 2]
            .copy_from_slice(&self.key_count.to_le_bytes());
        data[Self::OFFSET_LEVEL..Self::OFFSET_LEVEL + 4].copy_from_slice(&self.level.to_le_bytes());
    }
}
