//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array, the unit of I/O between the index
//! file and the buffer pool. Node layouts are written into it by the
//! B+Tree codec; the page itself only knows about its [`PageHeader`] and
//! how to read and write little-endian fields at fixed offsets.

use crate::common::config::PAGE_SIZE;
use crate::common::PageId;

use super::page_header::PageHeader;

/// A page of data (4KB, 4KB-aligned).
///
/// All multi-byte fields are little-endian. Field accessors panic if the
/// field runs past the end of the page; offsets come from fixed layouts.
///
/// # Example
/// ```
/// use badger_btree::storage::page::{Page, PageHeader, PageType};
///
/// let mut page = Page::new();
/// page.set_header(&PageHeader::leaf(0));
/// assert_eq!(page.header().page_type, PageType::BTreeLeaf);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Write a page header, leaving the body untouched.
    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    #[inline]
    fn field<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[offset..offset + N]);
        bytes
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes(self.field(offset))
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.field(offset))
    }

    #[inline]
    pub fn read_i32(&self, offset: usize) -> i32 {
        i32::from_le_bytes(self.field(offset))
    }

    #[inline]
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, offset: usize, value: i32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Optional page link; the invalid id reads back as `None`.
    #[inline]
    pub fn read_link(&self, offset: usize) -> Option<PageId> {
        PageId::from_raw(self.read_u32(offset))
    }

    #[inline]
    pub fn write_link(&mut self, offset: usize, link: Option<PageId>) {
        self.write_u32(offset, PageId::to_raw(link));
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PageType;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[4095] = 0xAB;

        page.reset();

        assert_eq!(page.as_slice()[0], 0);
        assert_eq!(page.as_slice()[4095], 0);
    }

    #[test]
    fn test_header_does_not_touch_body() {
        let mut page = Page::new();
        page.as_mut_slice()[PageHeader::SIZE] = 0x42;

        page.set_header(&PageHeader::internal(3, 2));

        let header = page.header();
        assert_eq!(header.page_type, PageType::BTreeInternal);
        assert_eq!(header.key_count, 3);
        assert_eq!(header.level, 2);
        assert_eq!(page.as_slice()[PageHeader::SIZE], 0x42);
    }

    #[test]
    fn test_fields_are_little_endian() {
        let mut page = Page::new();
        page.write_u32(8, 0x0403_0201);
        page.write_u16(12, 0x0605);
        page.write_i32(16, -2);

        assert_eq!(&page.as_slice()[8..14], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&page.as_slice()[16..20], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(page.read_u32(8), 0x0403_0201);
        assert_eq!(page.read_u16(12), 0x0605);
        assert_eq!(page.read_i32(16), -2);
    }

    #[test]
    fn test_field_at_end_of_page() {
        let mut page = Page::new();
        page.write_i32(PAGE_SIZE - 4, i32::MIN);
        assert_eq!(page.read_i32(PAGE_SIZE - 4), i32::MIN);
    }

    #[test]
    #[should_panic]
    fn test_field_past_end_of_page() {
        Page::new().read_u32(PAGE_SIZE - 2);
    }

    #[test]
    fn test_links() {
        let mut page = Page::new();
        page.write_link(8, Some(PageId::new(42)));
        page.write_link(12, None);

        assert_eq!(page.read_link(8), Some(PageId::new(42)));
        assert_eq!(page.read_link(12), None);
        assert_eq!(page.read_u32(12), u32::MAX);
    }
}
