//! Errors specific to BMT construction

use thiserror::Error;

use crate::MAX_SEGMENT_COUNT;

/// Errors raised when configuring a [`BmtHasher`](crate::BmtHasher).
///
/// Hashing itself is total and never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BmtError {
    /// Segment count outside `1..=MAX_SEGMENT_COUNT`
    #[error("invalid segment count {0}: must be between 1 and {MAX_SEGMENT_COUNT}")]
    InvalidSegmentCount(usize),
}
