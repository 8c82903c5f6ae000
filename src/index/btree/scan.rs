//! Range scan engine.
//!
//! A scan moves `Idle -> Active -> Idle`. While active it remembers only the
//! leaf page id and slot of the next candidate entry; the leaf is re-pinned
//! for each step so no page stays pinned between calls. Each step reads one
//! entry in place through a [`LeafView`].

use tracing::trace;

use crate::common::{Error, PageId, RecordId, Result};

use super::node::{LeafView, Node};
use super::BTreeIndex;

/// Comparison operator for a scan bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Lte,
    Gte,
    Gt,
}

impl Operator {
    /// Whether the operator can bound a scan from below.
    pub fn is_lower(self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte)
    }

    /// Whether the operator can bound a scan from above.
    pub fn is_upper(self) -> bool {
        matches!(self, Operator::Lt | Operator::Lte)
    }

    /// Evaluate `key <op> bound`.
    pub fn admits(self, key: i32, bound: i32) -> bool {
        match self {
            Operator::Lt => key < bound,
            Operator::Lte => key <= bound,
            Operator::Gte => key >= bound,
            Operator::Gt => key > bound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanState {
    Idle,
    Active {
        /// Leaf holding the next candidate, `None` once exhausted.
        leaf: Option<PageId>,
        slot: usize,
        high: i32,
        high_op: Operator,
    },
}

impl ScanState {
    pub(crate) fn is_active(&self) -> bool {
        matches!(self, ScanState::Active { .. })
    }
}

impl BTreeIndex {
    /// Begin a range scan over `low <low_op> key <high_op> high`.
    ///
    /// An active scan is ended first. On success the scan is positioned at
    /// the first qualifying entry.
    ///
    /// # Errors
    /// - `Error::BadPredicate` unless `low_op` is `Gt`/`Gte` and `high_op`
    ///   is `Lt`/`Lte`
    /// - `Error::BadRange` if `low > high`
    /// - `Error::NoSuchKey` if no entry satisfies both bounds
    pub fn start_scan(&mut self, low: i32, low_op: Operator, high: i32, high_op: Operator) -> Result<()> {
        if !low_op.is_lower() || !high_op.is_upper() {
            return Err(Error::BadPredicate);
        }
        if low > high {
            return Err(Error::BadRange { low, high });
        }

        if self.scan.is_active() {
            trace!("replacing active scan");
            self.scan = ScanState::Idle;
        }

        let (leaf_id, slot, first_key) = self.find_first(low, low_op)?.ok_or(Error::NoSuchKey)?;
        if !high_op.admits(first_key, high) {
            return Err(Error::NoSuchKey);
        }

        trace!(low, ?low_op, high, ?high_op, leaf = %leaf_id, slot, "scan started");

        self.scan = ScanState::Active {
            leaf: Some(leaf_id),
            slot,
            high,
            high_op,
        };
        Ok(())
    }

    /// Next record id of the active scan, in ascending key order.
    ///
    /// # Errors
    /// - `Error::ScanNotInitialized` if no scan is active
    /// - `Error::ScanComplete` once every matching entry was returned
    pub fn scan_next(&mut self) -> Result<RecordId> {
        let ScanState::Active {
            leaf,
            slot,
            high,
            high_op,
        } = &mut self.scan
        else {
            return Err(Error::ScanNotInitialized);
        };

        while let Some(page_id) = *leaf {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let view = LeafView::new(page_id, &guard)?;

            let Some(entry) = view.get(*slot) else {
                *leaf = view.right_sibling();
                *slot = 0;
                continue;
            };

            if !high_op.admits(entry.key, *high) {
                *leaf = None;
                break;
            }

            *slot += 1;
            trace!(key = entry.key, rid = %entry.rid, "scan step");
            return Ok(entry.rid);
        }

        Err(Error::ScanComplete)
    }

    /// End the active scan.
    ///
    /// # Errors
    /// `Error::ScanNotInitialized` if no scan is active.
    pub fn end_scan(&mut self) -> Result<()> {
        if !self.scan.is_active() {
            return Err(Error::ScanNotInitialized);
        }
        self.scan = ScanState::Idle;
        trace!("scan ended");
        Ok(())
    }

    /// Start a scan and iterate over its record ids.
    ///
    /// A range with no matching entry yields an empty iterator. The scan is
    /// ended when the iterator is exhausted or dropped.
    pub fn scan(
        &mut self,
        low: i32,
        low_op: Operator,
        high: i32,
        high_op: Operator,
    ) -> Result<ScanIter<'_>> {
        let done = match self.start_scan(low, low_op, high, high_op) {
            Ok(()) => false,
            Err(Error::NoSuchKey) => true,
            Err(e) => return Err(e),
        };
        Ok(ScanIter { index: self, done })
    }

    /// Descend to the leaf that holds the first entry admitted by the low
    /// bound and return the leaf, the entry's slot and its key, skipping to
    /// right siblings when that leaf has no such entry.
    fn find_first(&self, low: i32, low_op: Operator) -> Result<Option<(PageId, usize, i32)>> {
        let mut page_id = self.descend(low, low_op)?;

        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            let leaf = LeafView::new(page_id, &guard)?;
            let slot = match low_op {
                Operator::Gt => leaf.upper_bound(low),
                _ => leaf.lower_bound(low),
            };
            if slot < leaf.len() {
                return Ok(Some((page_id, slot, leaf.key(slot))));
            }
            match leaf.right_sibling() {
                Some(next) => page_id = next,
                None => return Ok(None),
            }
        }
    }

    /// Follow separators from the root to a leaf.
    ///
    /// `Gte` takes the first child whose separator is `>= low` so equal keys
    /// left of a separator are not skipped; `Gt` routes ties right.
    fn descend(&self, low: i32, low_op: Operator) -> Result<PageId> {
        let mut page_id = self.meta.root_page;
        loop {
            let guard = self.bpm.fetch_page_read(page_id)?;
            match Node::from_page(page_id, &guard)? {
                Node::Leaf(_) => return Ok(page_id),
                Node::Internal(node) => {
                    let idx = match low_op {
                        Operator::Gt => node.upper_child(low),
                        _ => node.lower_child(low),
                    };
                    page_id = node.children[idx];
                }
            }
        }
    }
}

/// Iterator over the record ids of a scan started by [`BTreeIndex::scan`].
///
/// Yields `Err` once and then stops if a page cannot be read.
pub struct ScanIter<'a> {
    index: &'a mut BTreeIndex,
    done: bool,
}

impl Iterator for ScanIter<'_> {
    type Item = Result<RecordId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.index.scan_next() {
            Ok(rid) => Some(Ok(rid)),
            Err(e) => {
                self.done = true;
                let _ = self.index.end_scan();
                if e.is_end_of_scan() {
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

impl Drop for ScanIter<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.index.end_scan();
        }
    }
}
