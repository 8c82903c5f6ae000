//! Common types and utilities shared across the crate.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`]
//! - Error types
//! - Identifiers (PageId, FrameId, RecordId)

pub mod config;
pub mod error;
mod ids;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use ids::{FrameId, PageId, RecordId};
