//! Domain layer for the reservation core.
//!
//! Pure decision logic, free of I/O:
//! - the reservation state machine (hold, confirm, lazy expiry, cancel)
//! - the half-open interval conflict checker
//! - the validation rules for attaching a complementary service to an event
//!
//! Storage and inventory live in external collaborators; this crate only
//! decides what their state should become.

pub mod booking;
pub mod reservation;

pub use booking::{
    AttachmentRequest, BookingError, BookingStatus, EventWindow, ServiceBooking, TimeRange,
    find_conflict, first_overlap,
};
pub use reservation::{
    HoldPolicy, Money, Reservation, ReservationError, ReservationStatus, SeatClaim,
    ensure_available, validate_quantity,
};
