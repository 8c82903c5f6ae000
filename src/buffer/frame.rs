//! Frame - one page slot of the buffer pool.
//!
//! A [`Frame`] pairs a [`Page`] with the [`FrameState`] the pool tracks for
//! it. The state follows the guard protocol:
//!
//! ```text
//! empty --install--> resident (pinned once)
//! resident --pin / release--> resident (pin count up / down)
//! resident, unpinned, clean --evict--> empty
//! ```
//!
//! A guard's drop is the only `release`, and it reports whether the guard
//! wrote through. The frame folds that into its dirty bit, which stays set
//! until the pool has written the page back with [`Frame::mark_clean`].

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// Bookkeeping for the page held by a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameState {
    /// Page held by the frame, `None` while it sits on the free list.
    pub page_id: Option<PageId>,
    /// Live guards over the page.
    pub pin_count: u32,
    /// Written through a guard since the last write-back.
    pub dirty: bool,
}

/// A frame in the buffer pool.
///
/// The pool is driven by one index at a time; the locks give guards their
/// `&Page` / `&mut Page` and keep the state consistent across a guard's
/// drop, nothing more.
pub struct Frame {
    page: RwLock<Page>,
    state: Mutex<FrameState>,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            state: Mutex::new(FrameState::default()),
        }
    }

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Snapshot of the frame's bookkeeping.
    #[inline]
    pub fn state(&self) -> FrameState {
        *self.state.lock()
    }

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        self.state.lock().page_id
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.state.lock().pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Take `page_id` into an empty frame on behalf of the first guard.
    ///
    /// # Panics
    /// Panics if the frame still holds a page.
    pub fn install(&self, page_id: PageId) {
        let mut state = self.state.lock();
        assert!(
            state.page_id.is_none(),
            "frame already holds {:?}",
            state.page_id
        );
        *state = FrameState {
            page_id: Some(page_id),
            pin_count: 1,
            dirty: false,
        };
    }

    /// Add a guard to a resident page. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if the frame is empty.
    pub fn pin(&self) -> u32 {
        let mut state = self.state.lock();
        assert!(state.page_id.is_some(), "pin on an empty frame");
        state.pin_count += 1;
        state.pin_count
    }

    /// Drop a guard, recording whether it wrote through. Returns the new pin
    /// count; at zero the frame may be evicted.
    ///
    /// # Panics
    /// Panics if no guard is outstanding.
    pub fn release(&self, wrote: bool) -> u32 {
        let mut state = self.state.lock();
        assert!(state.pin_count > 0, "pin count underflow");
        state.pin_count -= 1;
        state.dirty |= wrote;
        state.pin_count
    }

    /// The page reached disk; forget the pending write-back.
    #[inline]
    pub fn mark_clean(&self) {
        self.state.lock().dirty = false;
    }

    /// Empty the frame for reuse and return the page it held.
    ///
    /// # Panics
    /// Panics if the page is still pinned or has not been written back.
    pub fn evict(&self) -> Option<PageId> {
        let mut state = self.state.lock();
        assert_eq!(state.pin_count, 0, "evicting a pinned frame");
        assert!(!state.dirty, "evicting a dirty frame");
        std::mem::take(&mut *state).page_id
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
