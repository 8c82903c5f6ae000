//! Record sources for building an index.
//!
//! An index is bulk-loaded from a [`RecordSource`]: a single-pass producer of
//! `(RecordId, bytes)` records. Running out of records is the normal end of
//! the load, reported as `Ok(None)`.

use crate::common::{RecordId, Result};

/// One record of the indexed relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub rid: RecordId,
    pub data: Vec<u8>,
}

/// Sequential, finite producer of records.
pub trait RecordSource {
    /// Next record, or `None` once the relation is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// An in-memory relation.
///
/// # Example
/// ```
/// use badger_btree::{MemoryRelation, RecordSource};
///
/// let mut rel = MemoryRelation::from_keys(4, [7, 3]);
/// let first = rel.next_record().unwrap().unwrap();
/// assert_eq!(&first.data[4..8], &7i32.to_le_bytes());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRelation {
    records: Vec<Record>,
    cursor: usize,
}

impl MemoryRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// One record per key, with the key stored little-endian at
    /// `attr_offset` and zeroes before it.
    ///
    /// The n-th record gets `RecordId::new(n, 0)`.
    pub fn from_keys<I>(attr_offset: usize, keys: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let mut rel = Self::new();
        for (n, key) in keys.into_iter().enumerate() {
            let mut data = vec![0u8; attr_offset + 4];
            data[attr_offset..].copy_from_slice(&key.to_le_bytes());
            rel.push(RecordId::new(n as u32, 0), data);
        }
        rel
    }

    pub fn push(&mut self, rid: RecordId, data: Vec<u8>) {
        self.records.push(Record { rid, data });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start producing records from the beginning again.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl RecordSource for MemoryRelation {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let record = self.records.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keys_layout() {
        let mut rel = MemoryRelation::from_keys(2, [-1, 5]);
        assert_eq!(rel.len(), 2);

        let first = rel.next_record().unwrap().unwrap();
        assert_eq!(first.rid, RecordId::new(0, 0));
        assert_eq!(first.data, vec![0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);

        let second = rel.next_record().unwrap().unwrap();
        assert_eq!(second.rid, RecordId::new(1, 0));
        assert_eq!(&second.data[2..], &5i32.to_le_bytes());

        assert!(rel.next_record().unwrap().is_none());
    }

    #[test]
    fn test_rewind() {
        let mut rel = MemoryRelation::from_keys(0, [1]);
        assert!(rel.next_record().unwrap().is_some());
        assert!(rel.next_record().unwrap().is_none());

        rel.rewind();
        assert!(rel.next_record().unwrap().is_some());
    }
}
