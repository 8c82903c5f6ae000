//! Buffer Pool Manager - the page cache under the B+Tree.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between the index file and memory
//! - Pin-based reference counting through RAII guards
//! - Write-back of dirty pages on eviction and flush
//! - LRU eviction of unpinned frames

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching the pages of one index file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ LruReplacer  │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Pin discipline
/// Every fetch pins its frame and returns a guard; the guard's drop is the
/// only unpin. A frame is eligible for eviction exactly when its pin count
/// is zero.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("emp.0")?;
/// let bpm = BufferPoolManager::new(16, dm);
///
/// let mut guard = bpm.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// drop(guard); // unpinned dirty
///
/// let guard = bpm.fetch_page_read(PageId::new(0))?;
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Maps resident page IDs to frame IDs.
    page_table: RwLock<HashMap<PageId, FrameId>>,

    /// Stack of free frame IDs.
    free_list: Mutex<Vec<FrameId>>,

    replacer: Mutex<LruReplacer>,

    disk_manager: Mutex<DiskManager>,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Pin a page for reading.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for possible modification.
    ///
    /// The page is released dirty only if the guard is mutably dereferenced.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, false, lock))
    }

    /// Allocate a new zeroed page in the file and pin it.
    ///
    /// The returned guard is already dirty so the page reaches disk even if
    /// the caller leaves it zeroed.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from extending the file
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.get_free_frame()?;

        let page_id = match self.disk_manager.lock().allocate_page() {
            Ok(pid) => pid,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.install(page_id);

        self.page_table.write().insert(page_id, frame_id);
        self.record_pinned_access(frame_id);

        debug!(%page_id, %frame_id, "allocated page");

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, true, lock))
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write a resident page back to disk if it's dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        self.flush_frame(frame_id, page_id)
    }

    /// Write every dirty resident page back and sync the file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }

        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Public API: Info
    // ========================================================================

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Pages allocated in the underlying file.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    /// Pin count of a resident page, or `None` if it is not in the pool.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = *self.page_table.read().get(&page_id)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Frames currently pinned by live guards.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    /// Resident frames whose contents have not been written back.
    pub fn dirty_frame_count(&self) -> usize {
        self.frames
            .iter()
            .map(Frame::state)
            .filter(|state| state.page_id.is_some() && state.dirty)
            .count()
    }

    // ========================================================================
    // Internal: Called by page guards on drop
    // ========================================================================

    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        if self.frames[frame_id.0].release(is_dirty) == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        let resident = self.page_table.read().get(&page_id).copied();
        if let Some(frame_id) = resident {
            self.frames[frame_id.0].pin();
            self.record_pinned_access(frame_id);
            return Ok(frame_id);
        }

        self.handle_cache_miss(page_id)
    }

    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        let frame_id = self.get_free_frame()?;

        let page_data = match self.disk_manager.lock().read_page(page_id) {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        trace!(%page_id, %frame_id, "buffer pool miss");

        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        frame.install(page_id);

        self.page_table.write().insert(page_id, frame_id);
        self.record_pinned_access(frame_id);

        Ok(frame_id)
    }

    fn record_pinned_access(&self, frame_id: FrameId) {
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if let Some(old_page_id) = frame.page_id() {
            if let Err(e) = self.flush_frame(frame_id, old_page_id) {
                // Keep the victim resident so its dirty contents are not lost.
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
                return Err(e);
            }
        }

        if let Some(old_page_id) = frame.evict() {
            self.page_table.write().remove(&old_page_id);
            trace!(page_id = %old_page_id, %frame_id, "evicted page");
        }

        Ok(frame_id)
    }

    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let page = frame.page();
            self.disk_manager.lock().write_page(page_id, &page)?;
            drop(page);

            frame.mark_clean();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.idx")).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_new_page_ids_are_sequential() {
        let (bpm, _dir) = create_test_bpm(4);

        let guard = bpm.new_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(0));
        assert!(guard.is_dirty());
        drop(guard);

        let guard = bpm.new_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(1));
        drop(guard);

        assert_eq!(bpm.disk_page_count(), 2);
    }

    #[test]
    fn test_fetch_write_then_read() {
        let (bpm, _dir) = create_test_bpm(4);
        drop(bpm.new_page().unwrap());

        {
            let mut guard = bpm.fetch_page_write(PageId::new(0)).unwrap();
            guard.as_mut_slice()[0] = 0xCD;
            assert!(guard.is_dirty());
        }

        let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 0xCD);
    }

    #[test]
    fn test_write_guard_without_mutation_stays_clean() {
        let (bpm, _dir) = create_test_bpm(4);
        drop(bpm.new_page().unwrap());
        bpm.flush_all_pages().unwrap();
        assert_eq!(bpm.dirty_frame_count(), 0);

        {
            let guard = bpm.fetch_page_write(PageId::new(0)).unwrap();
            assert_eq!(guard.as_slice()[0], 0);
            assert!(!guard.is_dirty());
        }

        assert_eq!(bpm.dirty_frame_count(), 0);
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (bpm, _dir) = create_test_bpm(1);

        {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        }

        // Only one frame: allocating page 1 evicts page 0.
        drop(bpm.new_page().unwrap());
        assert_eq!(bpm.get_pin_count(PageId::new(0)), None);

        let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 0x42);
    }

    #[test]
    fn test_pin_count_tracking() {
        let (bpm, _dir) = create_test_bpm(4);

        drop(bpm.new_page().unwrap());
        assert_eq!(bpm.get_pin_count(PageId::new(0)), Some(0));

        let g1 = bpm.fetch_page_read(PageId::new(0)).unwrap();
        let g2 = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(bpm.get_pin_count(PageId::new(0)), Some(2));
        assert_eq!(bpm.pinned_frame_count(), 1);

        drop(g1);
        drop(g2);
        assert_eq!(bpm.get_pin_count(PageId::new(0)), Some(0));
        assert_eq!(bpm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_no_free_frames() {
        let (bpm, _dir) = create_test_bpm(2);

        let _guard1 = bpm.new_page().unwrap();
        let _guard2 = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_page_not_found_returns_frame() {
        let (bpm, _dir) = create_test_bpm(1);

        assert!(matches!(
            bpm.fetch_page_read(PageId::new(999)),
            Err(Error::PageNotFound(_))
        ));
        // The frame taken for the miss went back to the free list.
        assert!(bpm.new_page().is_ok());
    }

    #[test]
    fn test_flush_all_pages_clears_dirty() {
        let (bpm, _dir) = create_test_bpm(8);

        for i in 0..5u8 {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
        }
        assert_eq!(bpm.dirty_frame_count(), 5);

        bpm.flush_all_pages().unwrap();
        assert_eq!(bpm.dirty_frame_count(), 0);
    }
}
