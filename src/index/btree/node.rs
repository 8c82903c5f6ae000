//! Node codec: typed views of leaf and internal pages.
//!
//! A page is decoded by reading its [`PageHeader`] first and then exactly one
//! body layout. Decoded nodes are owned copies; they are only meaningful while
//! the page they came from stays pinned by the caller, and changes reach the
//! page again through `write_to`. Readers that only step through a leaf use
//! [`LeafView`], which reads entries in place.
//!
//! # Leaf layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       8     PageHeader (BTreeLeaf, key_count, level = -1)
//! 8       4     right sibling page id (u32::MAX = none)
//! 12      12*n  entries: key i32 | rid.page u32 | rid.slot u16 | pad u16
//! ```
//!
//! # Internal layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       8     PageHeader (BTreeInternal, key_count, level >= 1)
//! 8       4     child 0
//! 12      8*n   (key i32, child u32) pairs
//! ```

use crate::common::config::{INTERNAL_MAX_KEYS, LEAF_MAX_ENTRIES};
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::{Page, PageHeader, PageType, LEAF_LEVEL};

const BODY_OFFSET: usize = PageHeader::SIZE;
const ENTRIES_OFFSET: usize = BODY_OFFSET + 4;
const LEAF_ENTRY_SIZE: usize = 12;
const INTERNAL_PAIR_SIZE: usize = 8;

#[inline]
fn leaf_entry_offset(slot: usize) -> usize {
    ENTRIES_OFFSET + slot * LEAF_ENTRY_SIZE
}

#[inline]
fn internal_pair_offset(slot: usize) -> usize {
    ENTRIES_OFFSET + slot * INTERNAL_PAIR_SIZE
}

/// One `(key, record id)` pair of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: i32,
    pub rid: RecordId,
}

impl LeafEntry {
    pub fn new(key: i32, rid: RecordId) -> Self {
        Self { key, rid }
    }
}

/// A decoded leaf page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    /// Sorted by key; equal keys keep insertion order.
    pub entries: Vec<LeafEntry>,
    pub right_sibling: Option<PageId>,
}

impl LeafNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry with key `>= key`.
    pub fn lower_bound(&self, key: i32) -> usize {
        self.entries.partition_point(|e| e.key < key)
    }

    /// Index of the first entry with key `> key`.
    pub fn upper_bound(&self, key: i32) -> usize {
        self.entries.partition_point(|e| e.key <= key)
    }

    /// Insert after every entry with an equal key.
    pub fn insert(&mut self, key: i32, rid: RecordId) {
        let pos = self.upper_bound(key);
        self.entries.insert(pos, LeafEntry::new(key, rid));
    }

    fn decode(view: &LeafView<'_>) -> Self {
        Self {
            entries: (0..view.len()).map(|slot| view.entry(slot)).collect(),
            right_sibling: view.right_sibling(),
        }
    }

    /// Encode into `page`, replacing whatever it held.
    ///
    /// # Panics
    /// Panics if the leaf holds more entries than a page fits.
    pub fn write_to(&self, page: &mut Page) {
        assert!(self.len() <= LEAF_MAX_ENTRIES, "leaf overflows page");

        page.reset();
        page.set_header(&PageHeader::leaf(self.len() as u16));
        page.write_link(BODY_OFFSET, self.right_sibling);

        for (slot, entry) in self.entries.iter().enumerate() {
            let off = leaf_entry_offset(slot);
            page.write_i32(off, entry.key);
            entry
                .rid
                .write_to(&mut page.as_mut_slice()[off + 4..off + 4 + RecordId::ENCODED_SIZE]);
        }
    }
}

/// A leaf page read in place.
///
/// The header is checked once when the view is made; entries are decoded
/// one at a time, so stepping through a leaf costs one entry per step
/// rather than a copy of the whole page.
#[derive(Clone, Copy)]
pub struct LeafView<'a> {
    page: &'a Page,
    len: usize,
}

impl<'a> LeafView<'a> {
    /// # Errors
    /// `Error::CorruptedPage` if the page is not a leaf or its entry count
    /// does not fit the page.
    pub fn new(page_id: PageId, page: &'a Page) -> Result<Self> {
        let header = page.header();
        if header.page_type != PageType::BTreeLeaf || !header.is_leaf() {
            return Err(Error::corrupted(
                page_id,
                format!(
                    "expected a leaf, found {:?} page with level {}",
                    header.page_type, header.level
                ),
            ));
        }

        let len = header.key_count as usize;
        if len > LEAF_MAX_ENTRIES {
            return Err(Error::corrupted(
                page_id,
                format!("leaf holds {} entries, page fits {}", len, LEAF_MAX_ENTRIES),
            ));
        }
        Ok(Self { page, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn right_sibling(&self) -> Option<PageId> {
        self.page.read_link(BODY_OFFSET)
    }

    pub fn key(&self, slot: usize) -> i32 {
        assert!(slot < self.len, "slot {} past leaf of {}", slot, self.len);
        self.page.read_i32(leaf_entry_offset(slot))
    }

    pub fn entry(&self, slot: usize) -> LeafEntry {
        let off = leaf_entry_offset(slot) + 4;
        let rid = &self.page.as_slice()[off..off + RecordId::ENCODED_SIZE];
        LeafEntry {
            key: self.key(slot),
            rid: RecordId::from_bytes(rid),
        }
    }

    /// The entry at `slot`, or `None` past the end of the leaf.
    pub fn get(&self, slot: usize) -> Option<LeafEntry> {
        (slot < self.len).then(|| self.entry(slot))
    }

    /// Index of the first entry with key `>= key`.
    pub fn lower_bound(&self, key: i32) -> usize {
        self.partition_point(|k| k < key)
    }

    /// Index of the first entry with key `> key`.
    pub fn upper_bound(&self, key: i32) -> usize {
        self.partition_point(|k| k <= key)
    }

    fn partition_point(&self, pred: impl Fn(i32) -> bool) -> usize {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pred(self.key(mid)) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

/// A decoded internal page.
///
/// `children.len() == keys.len() + 1` always holds for a decoded node.
///
/// Separators are not strict. Child `i` covers keys in the closed range
/// `[keys[i-1], keys[i]]`, so once duplicates straddle a split, entries
/// equal to a separator can sit in the subtrees on both sides of it, and
/// several adjacent separators can be equal. A search for an equal key
/// routes right; a search for the first equal entry routes left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    /// Height above the leaves; 1 means the children are leaves.
    pub level: i32,
    pub keys: Vec<i32>,
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// A fresh root over two children.
    pub fn new_root(level: i32, left: PageId, separator: i32, right: PageId) -> Self {
        Self {
            level,
            keys: vec![separator],
            children: vec![left, right],
        }
    }

    /// Child to follow for a key when ties route right.
    pub fn upper_child(&self, key: i32) -> usize {
        self.keys.partition_point(|&k| k <= key)
    }

    /// Child to follow to reach the first entry `>= key`.
    pub fn lower_child(&self, key: i32) -> usize {
        self.keys.partition_point(|&k| k < key)
    }

    /// Install the result of splitting the child at `slot`: `separator`
    /// goes at `keys[slot]` and `right` directly after the split child.
    ///
    /// The position cannot be recovered from `separator` alone. Equal
    /// separators may already sit on either side of `slot`, and placing the
    /// new child anywhere but next to its left half breaks leaf order.
    pub fn insert_at(&mut self, slot: usize, separator: i32, right: PageId) {
        debug_assert!(slot < self.children.len(), "slot past last child");
        self.keys.insert(slot, separator);
        self.children.insert(slot + 1, right);
    }

    fn decode(page_id: PageId, page: &Page, count: usize, level: i32) -> Result<Self> {
        if count == 0 || count > INTERNAL_MAX_KEYS {
            return Err(Error::corrupted(
                page_id,
                format!("internal node holds {} keys", count),
            ));
        }

        let mut keys = Vec::with_capacity(count);
        let mut children = Vec::with_capacity(count + 1);
        children.push(page.read_link(BODY_OFFSET));
        for slot in 0..count {
            let off = internal_pair_offset(slot);
            keys.push(page.read_i32(off));
            children.push(page.read_link(off + 4));
        }

        let children = children
            .into_iter()
            .map(|child| {
                child.ok_or_else(|| Error::corrupted(page_id, "internal node has a missing child"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            level,
            keys,
            children,
        })
    }

    /// Encode into `page`, replacing whatever it held.
    ///
    /// # Panics
    /// Panics if the counts are inconsistent or overflow the page.
    pub fn write_to(&self, page: &mut Page) {
        assert_eq!(self.children.len(), self.keys.len() + 1, "child count");
        assert!(self.keys.len() <= INTERNAL_MAX_KEYS, "internal node overflows page");

        page.reset();
        page.set_header(&PageHeader::internal(self.keys.len() as u16, self.level));

        page.write_link(BODY_OFFSET, Some(self.children[0]));

        for (slot, (&key, &child)) in self.keys.iter().zip(&self.children[1..]).enumerate() {
            let off = internal_pair_offset(slot);
            page.write_i32(off, key);
            page.write_link(off + 4, Some(child));
        }
    }
}

/// A tree page decoded into exactly one of the two node kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    /// Decode a pinned page.
    ///
    /// # Errors
    /// `Error::CorruptedPage` if the page type and level disagree, the page
    /// is not a tree node, or its counts do not fit the page.
    pub fn from_page(page_id: PageId, page: &Page) -> Result<Self> {
        let header = page.header();
        let count = header.key_count as usize;

        match (header.page_type, header.is_leaf()) {
            (PageType::BTreeLeaf, true) => {
                Ok(Node::Leaf(LeafNode::decode(&LeafView::new(page_id, page)?)))
            }
            (PageType::BTreeInternal, false) if header.level > 0 => Ok(Node::Internal(
                InternalNode::decode(page_id, page, count, header.level)?,
            )),
            (page_type, _) => Err(Error::corrupted(
                page_id,
                format!("{:?} page with level {}", page_type, header.level),
            )),
        }
    }

    pub fn level(&self) -> i32 {
        match self {
            Node::Leaf(_) => LEAF_LEVEL,
            Node::Internal(node) => node.level,
        }
    }

    pub fn write_to(&self, page: &mut Page) {
        match self {
            Node::Leaf(leaf) => leaf.write_to(page),
            Node::Internal(node) => node.write_to(page),
        }
    }
}
