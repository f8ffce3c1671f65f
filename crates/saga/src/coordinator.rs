//! Cancellation saga coordinator.

use std::time::Duration;

use common::{BookingId, ReservationId};
use domain::ServiceBooking;

use crate::cancellation;
use crate::error::CollaboratorError;
use crate::outcome::{CancellationFailure, CancellationOutcome, PartialFailure};
use crate::services::{ReservationStore, ServiceBookingStore};
use crate::timeout::bounded;

/// Orchestrates cancellation of a reservation and its dependent service booking.
///
/// The two live in independent stores with no shared transaction, so the saga
/// runs three ordered steps:
///
/// ```text
/// A: cancel reservation ──fail──► Failure
///        │ ok
/// B: find dependent booking ──none──► Success
///        │ found     └──error──► PartialFailure(DependentCheckFailed)
/// C: cancel booking ──ok──► Success
///                   └──error──► PartialFailure(DependentCancelFailed)
/// ```
///
/// Step A is the gate. After it succeeds nothing is rolled back and the
/// outcome can no longer be `Failure`. Every step is idempotent, so the
/// whole saga can be re-run after a partial failure or a timeout.
pub struct CancellationSaga<R, B>
where
    R: ReservationStore,
    B: ServiceBookingStore,
{
    reservations: R,
    bookings: B,
    call_timeout: Duration,
}

impl<R, B> CancellationSaga<R, B>
where
    R: ReservationStore,
    B: ServiceBookingStore,
{
    /// Creates a new saga coordinator.
    pub fn new(reservations: R, bookings: B, call_timeout: Duration) -> Self {
        Self {
            reservations,
            bookings,
            call_timeout,
        }
    }

    /// Runs the cancellation saga for a reservation.
    #[tracing::instrument(skip(self), fields(saga_type = cancellation::SAGA_TYPE))]
    pub async fn cancel(&self, reservation_id: ReservationId) -> CancellationOutcome {
        metrics::counter!("cancellation_saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let outcome = self.run(reservation_id).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("cancellation_saga_duration_seconds").record(duration);
        metrics::counter!("cancellation_saga_total", "outcome" => outcome.kind()).increment(1);

        match &outcome {
            CancellationOutcome::Success => {
                tracing::info!(%reservation_id, duration, "cancellation saga completed");
            }
            CancellationOutcome::PartialFailure(_) => {
                tracing::warn!(%reservation_id, %outcome, "reservation cancelled, dependent booking needs manual review");
            }
            CancellationOutcome::Failure(_) => {
                tracing::error!(%reservation_id, %outcome, "reservation cancellation failed");
            }
        }

        outcome
    }

    async fn run(&self, reservation_id: ReservationId) -> CancellationOutcome {
        // Step A: cancel the reservation. Any failure aborts the saga.
        tracing::info!(step = cancellation::STEP_CANCEL_RESERVATION, "saga step started");
        match bounded(
            "reservations.cancel",
            self.call_timeout,
            self.reservations.cancel(reservation_id),
        )
        .await
        {
            Ok(reservation) => {
                tracing::info!(
                    step = cancellation::STEP_CANCEL_RESERVATION,
                    status = %reservation.status(),
                    "saga step completed"
                );
            }
            Err(e) => {
                return CancellationOutcome::Failure(CancellationFailure::PrimaryCancelFailed {
                    reason: e.to_string(),
                });
            }
        }

        // Step B: look up the booking that originated from this reservation.
        tracing::info!(step = cancellation::STEP_FIND_DEPENDENT, "saga step started");
        let dependent = match bounded(
            "service_bookings.find_by_reservation",
            self.call_timeout,
            self.bookings.find_by_reservation(reservation_id),
        )
        .await
        {
            Ok(Some(booking)) => booking,
            Ok(None) => return CancellationOutcome::Success,
            Err(e) if e.is_not_found() => return CancellationOutcome::Success,
            Err(e) => {
                return CancellationOutcome::PartialFailure(
                    PartialFailure::DependentCheckFailed {
                        reason: e.to_string(),
                    },
                );
            }
        };

        // Already cancelled by an earlier run.
        if !dependent.is_active() {
            tracing::info!(
                step = cancellation::STEP_FIND_DEPENDENT,
                booking_id = %dependent.id,
                "dependent booking already cancelled"
            );
            return CancellationOutcome::Success;
        }

        // Step C: cancel the dependent booking.
        self.cancel_dependent(&dependent).await
    }

    async fn cancel_dependent(&self, dependent: &ServiceBooking) -> CancellationOutcome {
        let booking_id: BookingId = dependent.id;
        tracing::info!(
            step = cancellation::STEP_CANCEL_DEPENDENT,
            %booking_id,
            "saga step started"
        );

        match bounded(
            "service_bookings.cancel",
            self.call_timeout,
            self.bookings.cancel(booking_id),
        )
        .await
        {
            Ok(_) => CancellationOutcome::Success,
            // Gone from the store counts as cancelled.
            Err(CollaboratorError::NotFound { .. }) => CancellationOutcome::Success,
            Err(e) => CancellationOutcome::PartialFailure(PartialFailure::DependentCancelFailed {
                booking_id,
                reason: e.to_string(),
            }),
        }
    }
}
