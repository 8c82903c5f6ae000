//! Insertion engine.
//!
//! Insertion descends from the root to the target leaf and splices splits
//! back up on the way out. Each level reports an [`InsertOutcome`] to its
//! parent; propagation stops at the first level that absorbs the new entry.
//! Root growth is handled once, at the top, and is the only place the tree
//! gains depth.

use tracing::{debug, trace};

use crate::common::{PageId, RecordId, Result};
use crate::storage::page::LEAF_LEVEL;

use super::node::{InternalNode, LeafNode, Node};
use super::BTreeIndex;

/// What a subtree reports back to its parent after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    /// The subtree absorbed the entry.
    NoSplit,
    /// The subtree's top node split; the parent must install `separator`
    /// with `right` as the child to its right.
    Split {
        separator: i32,
        right: PageId,
        /// Level of the node that split.
        level: i32,
    },
}

impl BTreeIndex {
    /// Insert a `(key, rid)` entry.
    ///
    /// Duplicate keys are accepted; equal keys come back from a scan in
    /// insertion order.
    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        trace!(key, %rid, "insert");

        let root = self.meta.root_page;
        if let InsertOutcome::Split {
            separator,
            right,
            level,
        } = self.insert_into(root, key, rid)?
        {
            self.grow_root(root, separator, right, level)?;
        }
        Ok(())
    }

    fn insert_into(&self, page_id: PageId, key: i32, rid: RecordId) -> Result<InsertOutcome> {
        let node = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            Node::from_page(page_id, &guard)?
        };

        match node {
            Node::Leaf(leaf) => self.insert_into_leaf(page_id, leaf, key, rid),
            Node::Internal(node) => {
                let slot = node.upper_child(key);
                match self.insert_into(node.children[slot], key, rid)? {
                    InsertOutcome::NoSplit => Ok(InsertOutcome::NoSplit),
                    InsertOutcome::Split {
                        separator, right, ..
                    } => self.insert_into_internal(page_id, node, slot, separator, right),
                }
            }
        }
    }

    fn insert_into_leaf(
        &self,
        page_id: PageId,
        mut leaf: LeafNode,
        key: i32,
        rid: RecordId,
    ) -> Result<InsertOutcome> {
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        leaf.insert(key, rid);

        if leaf.len() <= self.leaf_capacity() {
            leaf.write_to(&mut guard);
            return Ok(InsertOutcome::NoSplit);
        }

        let mut right_guard = self.bpm.new_page()?;
        let right_id = right_guard.page_id();

        let split_at = self.leaf_capacity() / 2;
        let right = LeafNode {
            entries: leaf.entries.split_off(split_at),
            right_sibling: leaf.right_sibling,
        };
        leaf.right_sibling = Some(right_id);

        let separator = right.entries[0].key;
        leaf.write_to(&mut guard);
        right.write_to(&mut right_guard);

        debug!(
            left = %page_id,
            right = %right_id,
            separator,
            left_len = leaf.len(),
            right_len = right.len(),
            "split leaf"
        );

        Ok(InsertOutcome::Split {
            separator,
            right: right_id,
            level: LEAF_LEVEL,
        })
    }

    fn insert_into_internal(
        &self,
        page_id: PageId,
        mut node: InternalNode,
        slot: usize,
        separator: i32,
        child: PageId,
    ) -> Result<InsertOutcome> {
        let mut guard = self.bpm.fetch_page_write(page_id)?;
        node.insert_at(slot, separator, child);

        if node.keys.len() <= self.internal_capacity() {
            node.write_to(&mut guard);
            return Ok(InsertOutcome::NoSplit);
        }

        let mut right_guard = self.bpm.new_page()?;
        let right_id = right_guard.page_id();

        // The middle key moves up and stays in neither half.
        let mid = node.keys.len() / 2;
        let push_up = node.keys[mid];
        let right_keys = node.keys.split_off(mid + 1);
        node.keys.truncate(mid);
        let right = InternalNode {
            level: node.level,
            keys: right_keys,
            children: node.children.split_off(mid + 1),
        };

        node.write_to(&mut guard);
        right.write_to(&mut right_guard);

        debug!(
            left = %page_id,
            right = %right_id,
            separator = push_up,
            level = node.level,
            "split internal node"
        );

        Ok(InsertOutcome::Split {
            separator: push_up,
            right: right_id,
            level: node.level,
        })
    }

    fn grow_root(&mut self, old_root: PageId, separator: i32, right: PageId, level: i32) -> Result<()> {
        let level = if level == LEAF_LEVEL { 1 } else { level + 1 };

        let new_root = {
            let mut guard = self.bpm.new_page()?;
            InternalNode::new_root(level, old_root, separator, right).write_to(&mut guard);
            guard.page_id()
        };

        self.meta.root_page = new_root;
        self.write_meta()?;

        debug!(old = %old_root, new = %new_root, level, "grew root");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::IndexConfig;
    use crate::index::btree::AttrType;
    use crate::relation::MemoryRelation;
    use tempfile::{tempdir, TempDir};

    fn empty_index(leaf: usize, internal: usize) -> (BTreeIndex, TempDir) {
        let dir = tempdir().unwrap();
        let config = IndexConfig::new(dir.path())
            .with_pool_size(16)
            .with_leaf_capacity(leaf)
            .with_internal_capacity(internal);
        let index =
            BTreeIndex::open_or_create(&config, "t", 0, AttrType::Integer, &mut MemoryRelation::new())
                .unwrap();
        (index, dir)
    }

    fn read_node(index: &BTreeIndex, page_id: PageId) -> Node {
        let guard = index.buffer_pool().fetch_page_read(page_id).unwrap();
        Node::from_page(page_id, &guard).unwrap()
    }

    fn leaf_keys(index: &BTreeIndex, page_id: PageId) -> Vec<i32> {
        match read_node(index, page_id) {
            Node::Leaf(leaf) => leaf.entries.iter().map(|e| e.key).collect(),
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_without_split() {
        let (mut index, _dir) = empty_index(4, 4);
        let root = index.root_page_id();

        for key in [30, 10, 20] {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }

        assert_eq!(index.root_page_id(), root);
        assert_eq!(leaf_keys(&index, root), vec![10, 20, 30]);
    }

    #[test]
    fn test_leaf_split_copies_up_first_key_of_right_leaf() {
        let (mut index, _dir) = empty_index(4, 4);
        let old_root = index.root_page_id();

        for key in 1..=5 {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }

        let root = index.root_page_id();
        assert_ne!(root, old_root);

        let Node::Internal(node) = read_node(&index, root) else {
            panic!("root should be internal after a split");
        };
        assert_eq!(node.level, 1);
        assert_eq!(node.children[0], old_root);
        assert_eq!(node.keys, vec![3]);

        assert_eq!(leaf_keys(&index, node.children[0]), vec![1, 2]);
        assert_eq!(leaf_keys(&index, node.children[1]), vec![3, 4, 5]);

        let Node::Leaf(left) = read_node(&index, node.children[0]) else {
            panic!("expected leaf");
        };
        assert_eq!(left.right_sibling, Some(node.children[1]));
    }

    #[test]
    fn test_internal_split_pushes_up_middle_key() {
        let (mut index, _dir) = empty_index(2, 2);

        // Ascending inserts into capacity-2 nodes force an internal split.
        for key in 0..5 {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }

        let Node::Internal(root) = read_node(&index, index.root_page_id()) else {
            panic!("expected internal root");
        };
        assert_eq!(root.level, 2);
        assert_eq!(root.keys.len(), 1);

        let separator = root.keys[0];
        for &child in &root.children {
            let Node::Internal(child) = read_node(&index, child) else {
                panic!("expected internal child");
            };
            assert!(!child.keys.contains(&separator));
            assert_eq!(child.children.len(), child.keys.len() + 1);
        }
    }

    #[test]
    fn test_root_growth_persists_meta() {
        let (mut index, _dir) = empty_index(4, 4);
        for key in 0..5 {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }

        let guard = index.buffer_pool().fetch_page_read(PageId::HEADER).unwrap();
        let stored = crate::index::btree::IndexMeta::from_page(&guard).unwrap();
        assert_eq!(stored.root_page, index.root_page_id());
    }

    #[test]
    fn test_insert_releases_all_pins() {
        let (mut index, _dir) = empty_index(2, 2);
        for key in (0..100).rev() {
            index.insert(key, RecordId::new(key as u32, 0)).unwrap();
        }
        assert_eq!(index.buffer_pool().pinned_frame_count(), 0);
    }

    #[test]
    fn test_duplicates_spanning_leaves() {
        let (mut index, _dir) = empty_index(2, 2);
        for slot in 0..9u16 {
            index.insert(7, RecordId::new(1, slot)).unwrap();
        }

        let shape = index.verify().unwrap();
        assert_eq!(shape.entry_count, 9);
        assert!(shape.leaf_count > 1);
    }
}
