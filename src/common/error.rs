//! Error types for the index and the page store beneath it.

use thiserror::Error;

use crate::common::{PageId, RecordId};
use crate::index::btree::AttrType;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the page store and the B+Tree index.
///
/// The index variants follow four classes:
/// - configuration: [`Error::IndexMismatch`]
/// - usage: [`Error::BadPredicate`], [`Error::BadRange`], [`Error::ScanNotInitialized`]
/// - not found: [`Error::NoSuchKey`]
/// - end of sequence: [`Error::ScanComplete`]
///
/// None of them are retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// A page's type marker, level or counts are inconsistent.
    #[error("{page_id} is corrupted: {reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    /// The index file exists but was built for a different relation or attribute.
    #[error(
        "index metadata mismatch: stored ({stored_relation}, {stored_offset}, {stored_type:?}), \
         requested ({requested_relation}, {requested_offset}, {requested_type:?})"
    )]
    IndexMismatch {
        stored_relation: String,
        stored_offset: u32,
        stored_type: AttrType,
        requested_relation: String,
        requested_offset: u32,
        requested_type: AttrType,
    },

    /// Only fixed-size integer attributes can be indexed.
    #[error("attribute type {0:?} cannot be indexed")]
    UnsupportedAttrType(AttrType),

    /// A record handed over during bulk load is too short to hold the key.
    #[error("record {rid} has {len} bytes, key at offset {offset} does not fit")]
    RecordTooShort { rid: RecordId, len: usize, offset: u32 },

    /// Rejected configuration value.
    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    /// Scan operators are not a lower bound followed by an upper bound.
    #[error("scan operators must be GT/GTE for the low bound and LT/LTE for the high bound")]
    BadPredicate,

    /// Low bound is greater than high bound.
    #[error("scan range is empty: low {low} > high {high}")]
    BadRange { low: i32, high: i32 },

    /// No entry in the tree satisfies the scan range.
    #[error("no key satisfies the scan range")]
    NoSuchKey,

    /// `scan_next` or `end_scan` called without an active scan.
    #[error("no scan has been started")]
    ScanNotInitialized,

    /// The active scan has produced every matching entry.
    #[error("scan completed")]
    ScanComplete,

    /// Reported by the structural verifier.
    #[error("B+Tree invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Whether this error is the normal end of a scan rather than a failure.
    #[inline]
    pub fn is_end_of_scan(&self) -> bool {
        matches!(self, Error::ScanComplete)
    }

    pub(crate) fn corrupted(page_id: PageId, reason: impl Into<String>) -> Self {
        Error::CorruptedPage {
            page_id,
            reason: reason.into(),
        }
    }
}
