//! Half-open time intervals and overlap detection.
//!
//! All ranges are `[start, end)`: a range ending exactly when another
//! starts does not overlap it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BookingError;

/// A non-empty half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting `end <= start` with `InvalidInterval`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if the two ranges share at least one instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Returns the index of the first existing range the candidate overlaps.
pub fn first_overlap<'a, I>(candidate: &TimeRange, existing: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a TimeRange>,
{
    existing
        .into_iter()
        .position(|range| candidate.overlaps(range))
}
