//! Identifier types: pages on disk, frames in the pool, records in a relation.

use std::fmt;

/// Identifies a page of the index file.
///
/// Using `u32` allows for 4 billion pages per file. Page 0 is always the
/// index header page.
///
/// # Example
/// ```
/// use badger_btree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel stored on disk where a page reference is absent
    /// (e.g. the right sibling of the last leaf).
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The header page of every index file.
    pub const HEADER: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode an on-disk page reference, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        let pid = PageId(raw);
        pid.is_valid().then_some(pid)
    }

    /// Encode an optional page reference for disk.
    #[inline]
    pub fn to_raw(pid: Option<PageId>) -> u32 {
        pid.unwrap_or(Self::INVALID).0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

/// Identifies a frame in the buffer pool (an index into the frame vector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Locates a record in the indexed relation: heap page number plus slot.
///
/// The index stores it as an opaque payload and never interprets it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_number: u32,
    pub slot_number: u16,
}

impl RecordId {
    /// Bytes taken by a record id inside a leaf entry.
    pub const ENCODED_SIZE: usize = 6;

    #[inline]
    pub fn new(page_number: u32, slot_number: u16) -> Self {
        Self {
            page_number,
            slot_number,
        }
    }

    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_number.to_le_bytes());
        buf[4..6].copy_from_slice(&self.slot_number.to_le_bytes());
    }

    pub(crate) fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_number: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            slot_number: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}:{})", self.page_number, self.slot_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
        assert!(PageId::HEADER.is_valid());
    }

    #[test]
    fn test_page_id_raw_encoding() {
        assert_eq!(PageId::from_raw(u32::MAX), None);
        assert_eq!(PageId::from_raw(7), Some(PageId::new(7)));
        assert_eq!(PageId::to_raw(None), u32::MAX);
        assert_eq!(PageId::to_raw(Some(PageId::new(3))), 3);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
        assert_eq!(format!("{}", FrameId::new(3)), "Frame(3)");
    }

    #[test]
    fn test_record_id_bytes() {
        let rid = RecordId::new(0x0102_0304, 0x0506);
        let mut buf = [0u8; RecordId::ENCODED_SIZE];
        rid.write_to(&mut buf);

        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0x06, 0x05]);
        assert_eq!(RecordId::from_bytes(&buf), rid);
        assert_eq!(rid.to_string(), "Rid(16909060:1286)");
    }
}
