//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between the B+Tree and its index
//! file. It manages a fixed pool of frames, each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache (pin, unpin, allocate, flush)
//! - [`Frame`] - A slot in the pool: a page plus its pin and dirty state
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards owning a pin
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameState};
pub use page_guard::{PageReadGuard, PageWriteGuard};
