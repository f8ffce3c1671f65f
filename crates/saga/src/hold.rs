//! Hold reservation manager.
//!
//! Creates ticket holds against a zone's seat inventory, applies lazy
//! expiry on every read, and promotes paid holds to confirmed purchases.

use std::sync::Arc;

use common::{Clock, EventId, ReservationId, UserId, ZoneId};
use domain::{Reservation, ReservationError, ensure_available, validate_quantity};

use crate::config::CoreConfig;
use crate::error::{CollaboratorError, Result, SagaError};
use crate::services::{
    Allocation, PaymentConfirmation, PaymentService, ReservationStore, SeatInventory, SeatRequest,
};
use crate::timeout::bounded;

/// Request to hold a number of seats in one zone.
#[derive(Debug, Clone)]
pub struct CreateHold {
    pub event_id: EventId,
    pub zone_id: ZoneId,
    pub user_id: UserId,
    pub quantity: u32,
}

/// Manages the hold → confirmed / expired part of the reservation lifecycle.
pub struct HoldManager<I, R, P>
where
    I: SeatInventory,
    R: ReservationStore,
    P: PaymentService,
{
    inventory: I,
    reservations: R,
    payments: P,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
}

impl<I, R, P> HoldManager<I, R, P>
where
    I: SeatInventory,
    R: ReservationStore,
    P: PaymentService,
{
    /// Creates a new hold manager.
    pub fn new(
        inventory: I,
        reservations: R,
        payments: P,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> Self {
        Self {
            inventory,
            reservations,
            payments,
            clock,
            config,
        }
    }

    /// Returns the number of seats currently available in a zone.
    #[tracing::instrument(skip(self))]
    pub async fn availability(&self, event_id: EventId, zone_id: ZoneId) -> Result<u32> {
        let available = bounded(
            "seat_inventory.available_seats",
            self.config.call_timeout,
            self.inventory.available_seats(event_id, zone_id),
        )
        .await?;
        Ok(available)
    }

    /// Holds `quantity` seats for a user.
    ///
    /// Fails with `InvalidQuantity` before any collaborator call, and with
    /// `InsufficientInventory` when the zone cannot supply every seat; in
    /// that case nothing stays allocated.
    #[tracing::instrument(skip(self), fields(event_id = %cmd.event_id, zone_id = %cmd.zone_id, quantity = cmd.quantity))]
    pub async fn create_hold(&self, cmd: CreateHold) -> Result<Reservation> {
        let result = self.try_create_hold(&cmd).await;
        match &result {
            Ok(reservation) => {
                metrics::counter!("holds_created_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.id(),
                    expires_at = %reservation.expires_at(),
                    "hold created"
                );
            }
            Err(err) => {
                metrics::counter!("holds_rejected_total", "reason" => rejection_reason(err))
                    .increment(1);
                tracing::info!(error = %err, "hold rejected");
            }
        }
        result
    }

    async fn try_create_hold(&self, cmd: &CreateHold) -> Result<Reservation> {
        validate_quantity(cmd.quantity)?;

        let available = self.availability(cmd.event_id, cmd.zone_id).await?;
        ensure_available(cmd.quantity, available)?;

        let reservation_id = ReservationId::new();
        let now = self.clock.now();
        let policy = self.config.hold_policy;
        let request = SeatRequest {
            event_id: cmd.event_id,
            zone_id: cmd.zone_id,
            reservation_id,
            quantity: cmd.quantity,
            hold_until: policy.expiry_for(now),
        };

        let allocation = match bounded(
            "seat_inventory.allocate",
            self.config.call_timeout,
            self.inventory.allocate(request),
        )
        .await
        {
            Ok(allocation) => allocation,
            Err(err) => {
                // The inventory may have allocated before the call failed.
                self.release_seats(reservation_id).await;
                return Err(err.into());
            }
        };

        let seats = match allocation {
            Allocation::Allocated(seats) => seats,
            // Someone else took the seats between the count and the allocation.
            Allocation::Insufficient { available } => {
                return Err(ReservationError::InsufficientInventory {
                    requested: cmd.quantity,
                    available,
                }
                .into());
            }
        };

        if seats.len() != cmd.quantity as usize {
            self.release_seats(reservation_id).await;
            return Err(CollaboratorError::Conflict(format!(
                "inventory allocated {} seats, {} requested",
                seats.len(),
                cmd.quantity
            ))
            .into());
        }

        let reservation = Reservation::hold(
            reservation_id,
            cmd.event_id,
            cmd.zone_id,
            cmd.user_id,
            seats,
            now,
            &policy,
        )?;

        match bounded(
            "reservations.create",
            self.config.call_timeout,
            self.reservations.create(reservation),
        )
        .await
        {
            Ok(created) => Ok(created),
            Err(err) => {
                self.release_seats(reservation_id).await;
                Err(err.into())
            }
        }
    }

    /// Loads a reservation with lazy expiry applied.
    ///
    /// This is the read path for anything shown to a user: a lapsed hold is
    /// returned as `Expired` (and recorded as such), never as payable.
    #[tracing::instrument(skip(self))]
    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation> {
        let stored = self.load(id).await?;
        let current = stored.expire(self.clock.now());

        if current.status() != stored.status() {
            metrics::counter!("reservations_expired_total").increment(1);
            self.record_expiry(&current).await;
        }

        Ok(current)
    }

    /// Applies a successful payment reported by the payment collaborator.
    ///
    /// Fails with `HoldExpired` if the hold lapsed before the payment
    /// arrived; the lapse is recorded so later reads agree. The confirmed
    /// status is stored before the seats are committed, and put back if
    /// the commit fails, so a failure never leaves seats sold to a hold.
    #[tracing::instrument(skip(self), fields(reservation_id = %confirmation.reservation_id, payment_id = %confirmation.payment_id))]
    pub async fn confirm(&self, confirmation: PaymentConfirmation) -> Result<Reservation> {
        let stored = self.load(confirmation.reservation_id).await?;

        let confirmed = match stored.confirm(self.clock.now()) {
            Ok(confirmed) => confirmed,
            Err(err @ ReservationError::HoldExpired { .. }) => {
                if stored.status() != domain::ReservationStatus::Expired {
                    self.record_expiry(&stored.expire(self.clock.now())).await;
                }
                tracing::warn!("payment arrived for an expired hold");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        if confirmation.amount != confirmed.total_price() {
            return Err(SagaError::PaymentMismatch {
                expected: confirmed.total_price(),
                received: confirmation.amount,
            });
        }

        // Record first: a commit that cannot be recorded would sell seats
        // to a reservation that still reads as a hold.
        bounded(
            "reservations.save",
            self.config.call_timeout,
            self.reservations.save(&confirmed),
        )
        .await?;
        if let Err(err) = bounded(
            "seat_inventory.commit",
            self.config.call_timeout,
            self.inventory.commit(confirmed.id()),
        )
        .await
        {
            self.restore(&stored).await;
            return Err(err.into());
        }

        metrics::counter!("reservations_confirmed_total").increment(1);
        tracing::info!(total = %confirmed.total_price(), "reservation confirmed");
        Ok(confirmed)
    }

    /// Charges the user for a held reservation and confirms it.
    ///
    /// An expired hold is rejected before any charge. If confirmation fails
    /// after the charge went through, the payment is refunded.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, id: ReservationId) -> Result<Reservation> {
        let current = self.get_reservation(id).await?;
        current.confirm(self.clock.now())?;

        let confirmation = bounded(
            "payments.charge",
            self.config.call_timeout,
            self.payments
                .charge(current.id(), current.user_id(), current.total_price()),
        )
        .await?;
        let payment_id = confirmation.payment_id.clone();

        match self.confirm(confirmation).await {
            Ok(confirmed) => Ok(confirmed),
            Err(err) => {
                tracing::warn!(%payment_id, error = %err, "confirmation failed after charge, refunding");
                if let Err(refund_err) = bounded(
                    "payments.refund",
                    self.config.call_timeout,
                    self.payments.refund(&payment_id),
                )
                .await
                {
                    tracing::error!(%payment_id, error = %refund_err, "refund failed; payment needs manual reversal");
                }
                Err(err)
            }
        }
    }

    async fn load(&self, id: ReservationId) -> Result<Reservation> {
        bounded(
            "reservations.get",
            self.config.call_timeout,
            self.reservations.get(id),
        )
        .await?
        .ok_or(SagaError::ReservationNotFound(id))
    }

    /// Persists a lazily detected expiry. The read still succeeds if this fails.
    async fn record_expiry(&self, expired: &Reservation) {
        if let Err(err) = bounded(
            "reservations.save",
            self.config.call_timeout,
            self.reservations.save(expired),
        )
        .await
        {
            tracing::warn!(reservation_id = %expired.id(), error = %err, "could not record hold expiry");
        }
    }

    /// Puts back the stored version after a confirmation could not complete.
    async fn restore(&self, previous: &Reservation) {
        if let Err(err) = bounded(
            "reservations.save",
            self.config.call_timeout,
            self.reservations.save(previous),
        )
        .await
        {
            tracing::error!(reservation_id = %previous.id(), error = %err, "could not restore reservation after failed commit");
        }
    }

    async fn release_seats(&self, reservation_id: ReservationId) {
        if let Err(err) = bounded(
            "seat_inventory.release",
            self.config.call_timeout,
            self.inventory.release(reservation_id),
        )
        .await
        {
            tracing::error!(%reservation_id, error = %err, "failed to release allocated seats");
        }
    }
}

fn rejection_reason(err: &SagaError) -> &'static str {
    match err {
        SagaError::Reservation(ReservationError::InvalidQuantity { .. }) => "invalid_quantity",
        SagaError::Reservation(ReservationError::InsufficientInventory { .. }) => {
            "insufficient_inventory"
        }
        SagaError::Collaborator(_) => "collaborator",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::ManualClock;
    use domain::{HoldPolicy, Money, ReservationStatus};

    use crate::services::{InMemoryPaymentService, InMemoryReservationStore, InMemorySeatInventory};

    type Manager =
        HoldManager<InMemorySeatInventory, InMemoryReservationStore, InMemoryPaymentService>;

    struct Fixture {
        manager: Manager,
        inventory: InMemorySeatInventory,
        reservations: InMemoryReservationStore,
        payments: InMemoryPaymentService,
        clock: ManualClock,
        event_id: EventId,
        zone_id: ZoneId,
    }

    async fn fixture(prices: &[i64]) -> Fixture {
        let clock = ManualClock::default();
        let inventory = InMemorySeatInventory::new(Arc::new(clock.clone()));
        let reservations = InMemoryReservationStore::new()
            .with_seat_inventory(inventory.clone())
            .with_clock(Arc::new(clock.clone()));
        let payments = InMemoryPaymentService::new();
        let event_id = EventId::new();
        let zone_id = ZoneId::new();
        inventory
            .add_zone(
                event_id,
                zone_id,
                prices
                    .iter()
                    .enumerate()
                    .map(|(i, cents)| (format!("F-{}", i + 1), Money::from_cents(*cents))),
            )
            .await;

        let config = CoreConfig {
            hold_policy: HoldPolicy::new(Duration::minutes(15)),
            ..CoreConfig::default()
        };
        let manager = HoldManager::new(
            inventory.clone(),
            reservations.clone(),
            payments.clone(),
            Arc::new(clock.clone()),
            config,
        );

        Fixture {
            manager,
            inventory,
            reservations,
            payments,
            clock,
            event_id,
            zone_id,
        }
    }

    fn cmd(f: &Fixture, quantity: u32) -> CreateHold {
        CreateHold {
            event_id: f.event_id,
            zone_id: f.zone_id,
            user_id: UserId::new(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_create_hold_with_exact_availability() {
        let f = fixture(&[3000, 3000, 4500]).await;

        let r = f.manager.create_hold(cmd(&f, 3)).await.unwrap();
        assert_eq!(r.status(), ReservationStatus::Hold);
        assert_eq!(r.seats().len(), 3);
        let sum: i64 = r.seats().iter().map(|s| s.unit_price.cents()).sum();
        assert_eq!(r.total_price().cents(), sum);
        assert_eq!(r.total_price(), Money::from_cents(10500));
        assert_eq!(f.inventory.held_for(r.id()).await, 3);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected_before_inventory() {
        let f = fixture(&[3000]).await;
        f.inventory.set_unavailable(true);

        let err = f.manager.create_hold(cmd(&f, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::Reservation(ReservationError::InvalidQuantity { quantity: 0 })
        ));
        assert_eq!(f.inventory.allocate_calls(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_inventory_allocates_nothing() {
        let f = fixture(&[3000, 3000, 3000]).await;

        let err = f.manager.create_hold(cmd(&f, 5)).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::Reservation(ReservationError::InsufficientInventory {
                requested: 5,
                available: 3,
            })
        ));
        assert_eq!(f.inventory.allocate_calls(), 0);
        assert_eq!(f.manager.availability(f.event_id, f.zone_id).await.unwrap(), 3);
        assert!(f.reservations.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_record_creation_releases_seats() {
        let f = fixture(&[3000, 3000]).await;
        f.reservations.set_fail_on_create(true);

        let err = f.manager.create_hold(cmd(&f, 2)).await.unwrap_err();
        assert!(matches!(err, SagaError::Collaborator(_)));
        assert_eq!(f.manager.availability(f.event_id, f.zone_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_applies_and_records_expiry() {
        let f = fixture(&[3000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();

        f.clock.advance(Duration::minutes(14));
        let read = f.manager.get_reservation(r.id()).await.unwrap();
        assert_eq!(read.status(), ReservationStatus::Hold);

        f.clock.advance(Duration::minutes(2));
        let read = f.manager.get_reservation(r.id()).await.unwrap();
        assert_eq!(read.status(), ReservationStatus::Expired);
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Expired)
        );
    }

    #[tokio::test]
    async fn test_get_unknown_reservation() {
        let f = fixture(&[3000]).await;
        let id = ReservationId::new();
        let err = f.manager.get_reservation(id).await.unwrap_err();
        assert!(matches!(err, SagaError::ReservationNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_confirm_commits_seats() {
        let f = fixture(&[3000, 2000]).await;
        let r = f.manager.create_hold(cmd(&f, 2)).await.unwrap();

        let confirmation = PaymentConfirmation {
            reservation_id: r.id(),
            payment_id: "PAY-EXT-1".to_string(),
            amount: r.total_price(),
            confirmed_at: f.clock.now(),
        };
        let confirmed = f.manager.confirm(confirmation).await.unwrap();

        assert_eq!(confirmed.status(), ReservationStatus::Confirmed);
        assert_eq!(f.inventory.sold_to(r.id()).await, 2);
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_confirm_expired_hold_fails() {
        let f = fixture(&[3000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();
        f.clock.advance(Duration::minutes(16));

        let confirmation = PaymentConfirmation {
            reservation_id: r.id(),
            payment_id: "PAY-EXT-2".to_string(),
            amount: r.total_price(),
            confirmed_at: f.clock.now(),
        };
        let err = f.manager.confirm(confirmation).await.unwrap_err();

        assert!(matches!(
            err,
            SagaError::Reservation(ReservationError::HoldExpired { .. })
        ));
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Expired)
        );
    }

    #[tokio::test]
    async fn test_confirm_rejects_wrong_amount() {
        let f = fixture(&[3000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();

        let confirmation = PaymentConfirmation {
            reservation_id: r.id(),
            payment_id: "PAY-EXT-3".to_string(),
            amount: Money::from_cents(100),
            confirmed_at: f.clock.now(),
        };
        let err = f.manager.confirm(confirmation).await.unwrap_err();
        assert!(matches!(err, SagaError::PaymentMismatch { .. }));
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Hold)
        );
    }

    #[tokio::test]
    async fn test_checkout_charges_and_confirms() {
        let f = fixture(&[5000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();

        let confirmed = f.manager.checkout(r.id()).await.unwrap();
        assert_eq!(confirmed.status(), ReservationStatus::Confirmed);
        assert_eq!(f.payments.payment_count().await, 1);
    }

    #[tokio::test]
    async fn test_checkout_never_charges_expired_hold() {
        let f = fixture(&[5000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();
        f.clock.advance(Duration::minutes(30));

        let err = f.manager.checkout(r.id()).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::Reservation(ReservationError::HoldExpired { .. })
        ));
        assert_eq!(f.payments.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_refunds_when_confirmation_fails() {
        let f = fixture(&[5000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();
        // Seats cannot be committed, so confirmation fails after the charge.
        f.inventory.set_unavailable(true);

        let err = f.manager.checkout(r.id()).await.unwrap_err();
        assert!(matches!(err, SagaError::Collaborator(_)));
        assert_eq!(f.payments.payment_count().await, 0);
        assert_eq!(f.payments.refunded().await.len(), 1);
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Hold)
        );
    }

    #[tokio::test]
    async fn test_unrecorded_confirmation_sells_nothing() {
        let f = fixture(&[5000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();
        f.reservations.set_fail_on_save(true);

        let err = f.manager.checkout(r.id()).await.unwrap_err();
        assert!(matches!(err, SagaError::Collaborator(CollaboratorError::Unavailable(_))));
        assert_eq!(f.payments.refunded().await.len(), 1);
        assert_eq!(f.inventory.sold_to(r.id()).await, 0);
        assert_eq!(f.inventory.held_for(r.id()).await, 1);
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Hold)
        );

        // The hold is still payable once the store recovers.
        f.reservations.set_fail_on_save(false);
        let confirmed = f.manager.checkout(r.id()).await.unwrap();
        assert_eq!(confirmed.status(), ReservationStatus::Confirmed);
        assert_eq!(f.inventory.sold_to(r.id()).await, 1);
    }

    #[tokio::test]
    async fn test_failed_commit_restores_hold() {
        let f = fixture(&[5000]).await;
        let r = f.manager.create_hold(cmd(&f, 1)).await.unwrap();
        f.inventory.set_unavailable(true);

        let confirmation = PaymentConfirmation {
            reservation_id: r.id(),
            payment_id: "PAY-EXT-4".to_string(),
            amount: r.total_price(),
            confirmed_at: f.clock.now(),
        };
        assert!(f.manager.confirm(confirmation.clone()).await.is_err());
        assert_eq!(
            f.reservations.status_of(r.id()).await,
            Some(ReservationStatus::Hold)
        );

        f.inventory.set_unavailable(false);
        let confirmed = f.manager.confirm(confirmation).await.unwrap();
        assert_eq!(confirmed.status(), ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_timed_out_allocation_is_released() {
        let f = fixture(&[3000, 3000]).await;
        let config = CoreConfig {
            hold_policy: HoldPolicy::new(Duration::minutes(15)),
            call_timeout: std::time::Duration::from_millis(100),
        };
        let manager = HoldManager::new(
            f.inventory.clone(),
            f.reservations.clone(),
            f.payments.clone(),
            Arc::new(f.clock.clone()),
            config,
        );
        f.inventory
            .set_allocate_delay(std::time::Duration::from_secs(2));

        let err = manager.create_hold(cmd(&f, 2)).await.unwrap_err();

        assert!(matches!(
            err,
            SagaError::Collaborator(CollaboratorError::Timeout { .. })
        ));
        assert_eq!(f.inventory.allocate_calls(), 1);
        assert_eq!(manager.availability(f.event_id, f.zone_id).await.unwrap(), 2);
        assert!(f.reservations.is_empty().await);
    }
}
