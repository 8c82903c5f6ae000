//! Eviction policy implementations (replacers).
//!
//! - [`LruReplacer`] - Least recently used

mod lru;

pub use lru::LruReplacer;
