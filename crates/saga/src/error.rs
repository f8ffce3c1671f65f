//! Error types for the orchestration layer.

use std::time::Duration;

use common::ReservationId;
use domain::{BookingError, Money, ReservationError};
use thiserror::Error;

/// Failure reported by, or while reaching, a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The collaborator has no record with that identifier.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The collaborator could not be reached or failed internally.
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request because of its own state.
    #[error("Collaborator rejected the request: {0}")]
    Conflict(String),

    /// No response within the per-call bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl CollaboratorError {
    /// Creates a `NotFound` error for the given resource kind.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        CollaboratorError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CollaboratorError::NotFound { .. })
    }
}

/// Errors returned by the hold and attachment managers.
///
/// The cancellation saga never returns these; it reports a
/// [`CancellationOutcome`](crate::CancellationOutcome) instead.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Reservation rule violated (quantity, inventory, expiry, transition).
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// Service scheduling rule violated.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The reservation store has no such reservation.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// A payment confirmation does not match the reservation total.
    #[error("Payment amount {received} does not match reservation total {expected}")]
    PaymentMismatch { expected: Money, received: Money },

    /// A collaborator call failed.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Convenience type alias for orchestration results.
pub type Result<T> = std::result::Result<T, SagaError>;
