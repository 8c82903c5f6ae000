//! Structural verification of a whole tree.

use crate::common::{Error, PageId, Result};
use crate::storage::page::LEAF_LEVEL;

use super::node::{InternalNode, LeafNode, Node};
use super::BTreeIndex;

/// Summary of a verified tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels including the leaf level; 1 for a lone root leaf.
    pub depth: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    pub entry_count: usize,
}

/// Inclusive key bounds a subtree must respect.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    low: Option<i32>,
    high: Option<i32>,
}

impl Bounds {
    const ALL: Bounds = Bounds {
        low: None,
        high: None,
    };

    fn contains(&self, key: i32) -> bool {
        self.low.map_or(true, |low| key >= low) && self.high.map_or(true, |high| key <= high)
    }
}

struct Walk {
    shape: TreeShape,
    leaf_depth: Option<usize>,
    /// Leaves in key order as reached from the root.
    leaves: Vec<PageId>,
}

fn violation(msg: String) -> Error {
    Error::InvariantViolation(msg)
}

impl BTreeIndex {
    /// Walk the whole tree and check its structural invariants.
    ///
    /// Checks sorted keys, occupancy, `children == keys + 1`, separator
    /// bounds, levels, uniform leaf depth, and that the sibling chain visits
    /// exactly the leaves in key order.
    ///
    /// # Errors
    /// `Error::InvariantViolation` describing the first broken invariant.
    pub fn verify(&self) -> Result<TreeShape> {
        let mut walk = Walk {
            shape: TreeShape::default(),
            leaf_depth: None,
            leaves: Vec::new(),
        };

        let root = self.meta.root_page;
        self.walk(root, Bounds::ALL, None, 1, true, &mut walk)?;
        self.check_sibling_chain(&walk.leaves)?;

        walk.shape.depth = walk.leaf_depth.unwrap_or(1);
        Ok(walk.shape)
    }

    fn walk(
        &self,
        page_id: PageId,
        bounds: Bounds,
        expected_level: Option<i32>,
        depth: usize,
        is_root: bool,
        walk: &mut Walk,
    ) -> Result<()> {
        let node = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            Node::from_page(page_id, &guard)?
        };

        if let Some(expected) = expected_level {
            if node.level() != expected {
                return Err(violation(format!(
                    "{} has level {}, parent expects {}",
                    page_id,
                    node.level(),
                    expected
                )));
            }
        }

        match node {
            Node::Leaf(leaf) => self.check_leaf(page_id, &leaf, bounds, depth, is_root, walk),
            Node::Internal(node) => {
                self.check_internal(page_id, &node, bounds)?;
                walk.shape.internal_count += 1;

                let child_level = if node.level == 1 {
                    LEAF_LEVEL
                } else {
                    node.level - 1
                };
                for (i, &child) in node.children.iter().enumerate() {
                    let child_bounds = Bounds {
                        low: if i == 0 { bounds.low } else { Some(node.keys[i - 1]) },
                        high: node.keys.get(i).copied().or(bounds.high),
                    };
                    self.walk(child, child_bounds, Some(child_level), depth + 1, false, walk)?;
                }
                Ok(())
            }
        }
    }

    fn check_leaf(
        &self,
        page_id: PageId,
        leaf: &LeafNode,
        bounds: Bounds,
        depth: usize,
        is_root: bool,
        walk: &mut Walk,
    ) -> Result<()> {
        if leaf.len() > self.leaf_capacity() {
            return Err(violation(format!(
                "{} holds {} entries, capacity {}",
                page_id,
                leaf.len(),
                self.leaf_capacity()
            )));
        }
        if leaf.is_empty() && !is_root {
            return Err(violation(format!("{} is an empty non-root leaf", page_id)));
        }
        if leaf.entries.windows(2).any(|w| w[0].key > w[1].key) {
            return Err(violation(format!("{} keys are not sorted", page_id)));
        }
        if let Some(entry) = leaf.entries.iter().find(|e| !bounds.contains(e.key)) {
            return Err(violation(format!(
                "{} key {} outside separator bounds {:?}",
                page_id, entry.key, bounds
            )));
        }

        match walk.leaf_depth {
            None => walk.leaf_depth = Some(depth),
            Some(d) if d != depth => {
                return Err(violation(format!(
                    "{} at depth {}, other leaves at depth {}",
                    page_id, depth, d
                )));
            }
            Some(_) => {}
        }

        walk.shape.leaf_count += 1;
        walk.shape.entry_count += leaf.len();
        walk.leaves.push(page_id);
        Ok(())
    }

    fn check_internal(&self, page_id: PageId, node: &InternalNode, bounds: Bounds) -> Result<()> {
        if node.keys.len() > self.internal_capacity() {
            return Err(violation(format!(
                "{} holds {} keys, capacity {}",
                page_id,
                node.keys.len(),
                self.internal_capacity()
            )));
        }
        if node.children.len() != node.keys.len() + 1 {
            return Err(violation(format!(
                "{} has {} children for {} keys",
                page_id,
                node.children.len(),
                node.keys.len()
            )));
        }
        if node.keys.windows(2).any(|w| w[0] > w[1]) {
            return Err(violation(format!("{} separators are not sorted", page_id)));
        }
        if let Some(key) = node.keys.iter().find(|&&k| !bounds.contains(k)) {
            return Err(violation(format!(
                "{} separator {} outside bounds {:?}",
                page_id, key, bounds
            )));
        }
        Ok(())
    }

    /// Follow right-sibling links from the leftmost leaf.
    fn check_sibling_chain(&self, leaves: &[PageId]) -> Result<()> {
        let mut next = leaves.first().copied();
        let mut last_key: Option<i32> = None;

        for (i, &expected) in leaves.iter().enumerate() {
            let page_id = next.ok_or_else(|| {
                violation(format!("sibling chain ends after {} of {} leaves", i, leaves.len()))
            })?;
            if page_id != expected {
                return Err(violation(format!(
                    "sibling chain reaches {} where {} was expected",
                    page_id, expected
                )));
            }

            let leaf = {
                let guard = self.bpm.fetch_page_read(page_id)?;
                match Node::from_page(page_id, &guard)? {
                    Node::Leaf(leaf) => leaf,
                    Node::Internal(_) => {
                        return Err(violation(format!("sibling link points at internal {}", page_id)))
                    }
                }
            };

            if let (Some(prev), Some(first)) = (last_key, leaf.entries.first()) {
                if first.key < prev {
                    return Err(violation(format!(
                        "{} starts at {} below previous leaf key {}",
                        page_id, first.key, prev
                    )));
                }
            }
            if let Some(entry) = leaf.entries.last() {
                last_key = Some(entry.key);
            }
            next = leaf.right_sibling;
        }

        if let Some(extra) = next {
            return Err(violation(format!(
                "last leaf links to unreachable {}",
                extra
            )));
        }
        Ok(())
    }
}
