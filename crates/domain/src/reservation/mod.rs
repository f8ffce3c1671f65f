//! Ticket reservations: holds, confirmation, expiry, and cancellation.

mod entity;
mod state;
mod value_objects;

pub use entity::{Reservation, ensure_available, validate_quantity};
pub use state::ReservationStatus;
pub use value_objects::{HoldPolicy, Money, SeatClaim};

use chrono::{DateTime, Utc};
use common::ReservationId;
use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Requested seat quantity is below one.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// The zone does not have enough available seats.
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u32, available: u32 },

    /// The hold lapsed before it could be confirmed.
    #[error("Hold {reservation_id} expired at {expired_at}")]
    HoldExpired {
        reservation_id: ReservationId,
        expired_at: DateTime<Utc>,
    },

    /// The reservation is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: ReservationStatus,
        action: &'static str,
    },
}
