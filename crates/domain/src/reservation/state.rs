//! Reservation state machine.

use serde::{Deserialize, Serialize};

/// The status of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Hold ──┬──► Confirmed ──► Cancelled
///        ├──► Expired
///        └──► Cancelled
/// ```
///
/// `Expired` is reached lazily: a `Hold` read after its expiry instant is
/// reported as `Expired`. `Confirmed` is only reached through a payment
/// confirmation, `Cancelled` only through the cancellation saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReservationStatus {
    /// Seats are held for a limited time, awaiting payment.
    #[default]
    Hold,

    /// Payment was received; the seats are sold.
    Confirmed,

    /// The hold lapsed before payment (terminal state).
    Expired,

    /// The reservation was cancelled (terminal state).
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if a payment confirmation may be applied in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, ReservationStatus::Hold)
    }

    /// Returns true if the reservation can move to `Cancelled` from this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Hold | ReservationStatus::Confirmed
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Hold => "Hold",
            ReservationStatus::Confirmed => "Confirmed",
            ReservationStatus::Expired => "Expired",
            ReservationStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
