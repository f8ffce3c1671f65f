//! Complementary-service booking entity.

use chrono::{DateTime, Utc};
use common::{BookingId, EventId, OrganizerId, ReservationId, ServiceId};
use serde::{Deserialize, Serialize};

use super::TimeRange;

/// Status of a complementary-service booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BookingStatus {
    /// The service slot is taken.
    #[default]
    Active,

    /// The booking was cancelled and no longer blocks the slot (terminal state).
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "Active",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A complementary service (catering, merchandise, transport) booked by an
/// organizer for a time range tied to one event.
///
/// The booking is a sibling of the ticket reservation, not a child: the
/// optional `reservation_id` only records which reservation it originated
/// from so the cancellation saga can discover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBooking {
    pub id: BookingId,
    pub service_id: ServiceId,
    pub organizer_id: OrganizerId,
    pub event_id: EventId,
    pub reservation_id: Option<ReservationId>,
    #[serde(flatten)]
    pub range: TimeRange,
    pub status: BookingStatus,
}

impl ServiceBooking {
    pub fn start(&self) -> DateTime<Utc> {
        self.range.start()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.range.end()
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// Returns true if this booking blocks the given range.
    ///
    /// Cancelled bookings never block.
    pub fn blocks(&self, range: &TimeRange) -> bool {
        self.is_active() && self.range.overlaps(range)
    }

    /// Returns the cancelled version of this booking. Cancelling twice is a no-op.
    pub fn cancel(&self) -> ServiceBooking {
        ServiceBooking {
            status: BookingStatus::Cancelled,
            ..self.clone()
        }
    }
}

/// Returns the first active booking that blocks the candidate range.
pub fn find_conflict<'a, I>(candidate: &TimeRange, existing: I) -> Option<&'a ServiceBooking>
where
    I: IntoIterator<Item = &'a ServiceBooking>,
{
    existing
        .into_iter()
        .find(|booking| booking.blocks(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, hour, 0, 0).unwrap()
    }

    fn booking(start: u32, end: u32, status: BookingStatus) -> ServiceBooking {
        ServiceBooking {
            id: BookingId::new(),
            service_id: ServiceId::new(),
            organizer_id: OrganizerId::new(),
            event_id: EventId::new(),
            reservation_id: None,
            range: TimeRange::new(t(start), t(end)).unwrap(),
            status,
        }
    }

    #[test]
    fn test_active_booking_blocks_overlap() {
        let b = booking(10, 14, BookingStatus::Active);
        let candidate = TimeRange::new(t(13), t(16)).unwrap();
        assert!(b.blocks(&candidate));
    }

    #[test]
    fn test_cancelled_booking_never_blocks() {
        let b = booking(10, 14, BookingStatus::Cancelled);
        let candidate = TimeRange::new(t(11), t(12)).unwrap();
        assert!(!b.blocks(&candidate));
    }

    #[test]
    fn test_find_conflict_skips_cancelled() {
        let cancelled = booking(10, 14, BookingStatus::Cancelled);
        let active = booking(12, 18, BookingStatus::Active);
        let existing = vec![cancelled, active.clone()];

        let candidate = TimeRange::new(t(11), t(13)).unwrap();
        assert_eq!(find_conflict(&candidate, &existing), Some(&active));

        let early = TimeRange::new(t(8), t(12)).unwrap();
        assert_eq!(find_conflict(&early, &existing), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let b = booking(10, 14, BookingStatus::Active);
        let once = b.cancel();
        assert_eq!(once.status, BookingStatus::Cancelled);
        assert_eq!(once.cancel(), once);
    }

    #[test]
    fn test_serializes_flat_range() {
        let b = booking(10, 14, BookingStatus::Active);
        let json = serde_json::to_value(&b).unwrap();
        assert!(json["start"].is_string());
        assert!(json["end"].is_string());
        assert_eq!(json["status"], "Active");
    }
}
