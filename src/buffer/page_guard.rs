//! RAII guards for page access.
//!
//! A guard is the only way to reach a page held by the pool, and it owns
//! the pin: dropping it unpins on every exit path, `?` included.
//! - [`PageReadGuard`] - Shared access, always released clean
//! - [`PageWriteGuard`] - Exclusive access, released dirty only if the
//!   page was actually borrowed mutably

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let header = guard.header();  // Deref to &Page
/// // guard drops here, page unpinned clean
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, false);
    }
}

/// Guard for exclusive page access.
///
/// Reading through the guard leaves the page clean; the first mutable
/// borrow marks it dirty, and the dirty flag is handed to the pool on drop.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page_write(page_id)?;
/// if must_update {
///     guard.as_mut_slice()[0] = 0xFF;  // DerefMut: now dirty
/// }
/// // guard drops here, unpinned with the recorded dirty flag
/// ```
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    dirty: bool,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        dirty: bool,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            dirty,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Whether the page will be released dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.dirty = true;
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, self.dirty);
    }
}
