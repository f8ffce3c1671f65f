//! Rules for attaching a complementary service to an event.

use chrono::{DateTime, Utc};
use common::{BookingId, EventId, OrganizerId, ReservationId, ServiceId};
use serde::{Deserialize, Serialize};

use super::{BookingError, BookingStatus, ServiceBooking, TimeRange, find_conflict};

/// The scheduled span of the event a service is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A request to book a complementary service into an event's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRequest {
    pub service_id: ServiceId,
    pub event_id: EventId,
    pub organizer_id: OrganizerId,
    /// Reservation this booking depends on, if any.
    pub reservation_id: Option<ReservationId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub event_window: EventWindow,
}

impl AttachmentRequest {
    /// Checks the rules that need no collaborator data, in order:
    /// the interval must be non-empty, then it must not run past the event.
    pub fn validate(&self) -> Result<TimeRange, BookingError> {
        let range = TimeRange::new(self.start, self.end)?;

        if range.end() > self.event_window.end {
            return Err(BookingError::OutsideEventWindow {
                end: range.end(),
                event_end: self.event_window.end,
            });
        }

        Ok(range)
    }

    /// Runs the conflict pre-check against every known booking of the service.
    pub fn check_conflicts<'a, I>(&self, range: &TimeRange, existing: I) -> Result<(), BookingError>
    where
        I: IntoIterator<Item = &'a ServiceBooking>,
    {
        match find_conflict(range, existing) {
            Some(conflicting) => Err(BookingError::SchedulingConflict {
                service_id: self.service_id,
                conflicting: Some(conflicting.id),
            }),
            None => Ok(()),
        }
    }

    /// Builds the active booking this request describes.
    pub fn into_booking(self, id: BookingId, range: TimeRange) -> ServiceBooking {
        ServiceBooking {
            id,
            service_id: self.service_id,
            organizer_id: self.organizer_id,
            event_id: self.event_id,
            reservation_id: self.reservation_id,
            range,
            status: BookingStatus::Active,
        }
    }
}
