//! LRU (Least Recently Used) replacement policy.
//!
//! B+Tree traffic touches the root and upper internal levels on every
//! operation, so recency keeps them resident while leaves cycle through.

use std::collections::{HashMap, HashSet};

use crate::common::FrameId;

/// Evicts the evictable frame whose last access is oldest.
///
/// Accesses are stamped with a logical clock; pinned frames are never
/// candidates.
pub struct LruReplacer {
    /// Logical timestamp of each tracked frame's latest access.
    last_access: HashMap<FrameId, u64>,

    /// Frames that are currently evictable (pin_count == 0).
    evictable: HashSet<FrameId>,

    clock: u64,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self {
            last_access: HashMap::new(),
            evictable: HashSet::new(),
            clock: 0,
        }
    }

    /// Record that a frame was accessed, making it the most recent.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        self.last_access.insert(frame_id, self.clock);
    }

    /// Mark a frame as evictable (pin_count dropped to 0) or pinned.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Select and forget the least recently used evictable frame.
    ///
    /// Returns `None` if every tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let victim = self
            .evictable
            .iter()
            .min_by_key(|fid| self.last_access.get(fid).copied().unwrap_or(0))
            .copied()?;

        self.evictable.remove(&victim);
        self.last_access.remove(&victim);
        Some(victim)
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_evicts_oldest_access() {
        let mut replacer = LruReplacer::new();

        for i in 0..3 {
            replacer.record_access(FrameId::new(i));
            replacer.set_evictable(FrameId::new(i), true);
        }
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_reaccess_moves_to_back() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.record_access(FrameId::new(0)); // root page touched again

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_lru_skips_pinned() {
        let mut replacer = LruReplacer::new();

        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.set_evictable(FrameId::new(1), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }
}
