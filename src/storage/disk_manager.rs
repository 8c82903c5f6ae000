//! Disk Manager - page-granular file I/O for one index file.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Existence checks and create/open of the index file
//! - Reading and writing pages
//! - Allocating new pages (ids are handed out once and never reused)

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single index file.
///
/// # File Layout
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0   │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (header) │ (root)  │         │         │         │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`.
///
/// # Durability
/// Writes go to the OS page cache; [`DiskManager::sync`] forces them to
/// stable storage. The buffer pool calls it when the index is flushed.
pub struct DiskManager {
    file: File,
    page_count: u32,
}

impl DiskManager {
    /// Whether a file already exists at `path`.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Create a new index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_allocated(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        trace!(%page_id, "read page");
        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_allocated(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(page.as_slice())?;

        trace!(%page_id, "wrote page");
        Ok(())
    }

    /// Extend the file by one zeroed page and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count == PageId::INVALID.0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "index file has no page ids left",
            )
            .into());
        }
        let page_id = PageId::new(self.page_count);

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Force all written pages to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    fn offset(page_id: PageId) -> u64 {
        (page_id.0 as u64) * (PAGE_SIZE as u64)
    }

    fn check_allocated(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }
        Ok(())
    }
}
