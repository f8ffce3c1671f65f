//! Reservation cancellation saga constants.

/// The saga type identifier for reservation cancellation.
pub const SAGA_TYPE: &str = "ReservationCancellation";

/// Step name: Cancel the reservation itself.
pub const STEP_CANCEL_RESERVATION: &str = "cancel_reservation";

/// Step name: Look up the service booking created from the reservation.
pub const STEP_FIND_DEPENDENT: &str = "find_dependent_booking";

/// Step name: Cancel that service booking.
pub const STEP_CANCEL_DEPENDENT: &str = "cancel_dependent_booking";
