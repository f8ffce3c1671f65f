//! Complementary-service bookings and interval conflict detection.

mod attachment;
mod entity;
mod interval;

pub use attachment::{AttachmentRequest, EventWindow};
pub use entity::{BookingStatus, ServiceBooking, find_conflict};
pub use interval::{TimeRange, first_overlap};

use chrono::{DateTime, Utc};
use common::{BookingId, ServiceId};
use thiserror::Error;

/// Errors that can occur when scheduling a complementary service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// The requested range is empty or inverted.
    #[error("Invalid interval: end {end} is not after start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The service would run past the end of its event.
    #[error("Service ends at {end}, after the event ends at {event_end}")]
    OutsideEventWindow {
        end: DateTime<Utc>,
        event_end: DateTime<Utc>,
    },

    /// The slot overlaps an active booking of the same service.
    ///
    /// `conflicting` is unknown when the booking store itself rejected the
    /// slot after the pre-check passed.
    #[error("Service {service_id} is already booked in that slot")]
    SchedulingConflict {
        service_id: ServiceId,
        conflicting: Option<BookingId>,
    },
}
