//! Shared types for the reservation core.
//!
//! Typed identifiers keep the many UUID-based references (reservations,
//! events, zones, services, bookings) from being mixed up, and the [`Clock`]
//! trait lets expiry logic run against a controllable time source in tests.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    BookingId, EventId, OrganizerId, ReservationId, SeatId, ServiceId, UserId, ZoneId,
};
