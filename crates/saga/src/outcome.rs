//! Result taxonomy of the cancellation saga.

use std::fmt;

use common::BookingId;

/// Final result of cancelling a reservation.
///
/// Once the reservation itself has been cancelled the outcome can only be
/// `Success` or `PartialFailure`; `Failure` means nothing was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// The reservation is cancelled and no active dependent booking remains.
    Success,

    /// The reservation is cancelled but cleanup of its dependent booking
    /// could not be confirmed. Needs follow-up.
    PartialFailure(PartialFailure),

    /// The reservation could not be cancelled. Nothing changed.
    Failure(CancellationFailure),
}

/// Why cleanup after a successful reservation cancel did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialFailure {
    /// Could not find out whether a dependent booking exists.
    DependentCheckFailed { reason: String },

    /// Found an active dependent booking but could not cancel it.
    DependentCancelFailed {
        booking_id: BookingId,
        reason: String,
    },
}

/// Why the reservation itself was not cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationFailure {
    PrimaryCancelFailed { reason: String },
}

impl CancellationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CancellationOutcome::Success)
    }

    /// Returns true if the reservation ended up cancelled.
    pub fn reservation_cancelled(&self) -> bool {
        !matches!(self, CancellationOutcome::Failure(_))
    }

    /// Returns true if an operator must reconcile leftover state.
    pub fn needs_manual_review(&self) -> bool {
        matches!(self, CancellationOutcome::PartialFailure(_))
    }

    /// Outcome kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            CancellationOutcome::Success => "success",
            CancellationOutcome::PartialFailure(_) => "partial_failure",
            CancellationOutcome::Failure(_) => "failure",
        }
    }

    /// Stable machine-readable code for the outcome.
    pub fn reason_code(&self) -> &'static str {
        match self {
            CancellationOutcome::Success => "cancelled",
            CancellationOutcome::PartialFailure(PartialFailure::DependentCheckFailed { .. }) => {
                "dependent_check_failed"
            }
            CancellationOutcome::PartialFailure(PartialFailure::DependentCancelFailed {
                ..
            }) => "dependent_cancel_failed",
            CancellationOutcome::Failure(CancellationFailure::PrimaryCancelFailed { .. }) => {
                "primary_cancel_failed"
            }
        }
    }

    /// Message suitable for showing to the person who asked to cancel.
    pub fn user_message(&self) -> &'static str {
        match self {
            CancellationOutcome::Success => "Your reservation has been cancelled.",
            CancellationOutcome::PartialFailure(_) => {
                "Your reservation has been cancelled, but we could not confirm that the linked \
                 service booking was released. Please contact support with your reservation number."
            }
            CancellationOutcome::Failure(_) => {
                "Your reservation could not be cancelled. Please try again."
            }
        }
    }

    /// Underlying collaborator error text, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            CancellationOutcome::Success => None,
            CancellationOutcome::PartialFailure(PartialFailure::DependentCheckFailed { reason })
            | CancellationOutcome::PartialFailure(PartialFailure::DependentCancelFailed {
                reason,
                ..
            })
            | CancellationOutcome::Failure(CancellationFailure::PrimaryCancelFailed { reason }) => {
                Some(reason.as_str())
            }
        }
    }
}

impl fmt::Display for CancellationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {}", self.reason_code(), detail),
            None => f.write_str(self.reason_code()),
        }
    }
}
