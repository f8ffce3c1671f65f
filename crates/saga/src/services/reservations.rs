//! Reservation store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Clock, ReservationId, SystemClock};
use domain::{Reservation, ReservationStatus};
use tokio::sync::RwLock;

use super::inventory::{InMemorySeatInventory, SeatInventory};
use crate::error::CollaboratorError;

/// Trait for the authoritative reservation store.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Records a newly created hold.
    async fn create(&self, reservation: Reservation) -> Result<Reservation, CollaboratorError>;

    /// Reads a reservation as stored, without applying expiry.
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, CollaboratorError>;

    /// Persists a status change (confirmation or recorded expiry).
    async fn save(&self, reservation: &Reservation) -> Result<(), CollaboratorError>;

    /// Cancels a reservation and releases its seats.
    ///
    /// A lapsed hold is expired first, so it comes back `Expired` whether or
    /// not it was read before. Idempotent: cancelling an already cancelled or
    /// expired reservation succeeds and returns it unchanged. On error the
    /// stored status is left as it was.
    async fn cancel(&self, id: ReservationId) -> Result<Reservation, CollaboratorError>;
}

/// In-memory reservation store for tests and the demo server.
///
/// When linked to an [`InMemorySeatInventory`], cancelling a reservation
/// releases its seats there, the way the remote store does.
#[derive(Clone)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
    seats: Option<InMemorySeatInventory>,
    clock: Arc<dyn Clock>,
    fail_on_create: Arc<AtomicBool>,
    fail_on_save: Arc<AtomicBool>,
    fail_on_cancel: Arc<AtomicBool>,
    cancel_delay_ms: Arc<AtomicU64>,
    cancel_calls: Arc<AtomicUsize>,
}

impl InMemoryReservationStore {
    /// Creates a new, empty store reading the system clock.
    pub fn new() -> Self {
        Self {
            reservations: Arc::default(),
            seats: None,
            clock: Arc::new(SystemClock),
            fail_on_create: Arc::default(),
            fail_on_save: Arc::default(),
            fail_on_cancel: Arc::default(),
            cancel_delay_ms: Arc::default(),
            cancel_calls: Arc::default(),
        }
    }

    /// Links the store to a seat inventory so cancellation releases seats.
    pub fn with_seat_inventory(mut self, seats: InMemorySeatInventory) -> Self {
        self.seats = Some(seats);
        self
    }

    /// Reads time from `clock` when deciding whether a hold has lapsed.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configures the service to fail on subsequent create calls.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Configures the service to fail on subsequent save calls.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }

    /// Configures the service to fail on subsequent cancel calls.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.fail_on_cancel.store(fail, Ordering::SeqCst);
    }

    /// Delays every cancel call, to exercise caller timeouts.
    pub fn set_cancel_delay(&self, delay: Duration) {
        self.cancel_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns how many cancel requests were received.
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Returns the stored status of a reservation.
    pub async fn status_of(&self, id: ReservationId) -> Option<ReservationStatus> {
        self.reservations.read().await.get(&id).map(|r| r.status())
    }

    /// Returns the number of stored reservations.
    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, reservation: Reservation) -> Result<Reservation, CollaboratorError> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "reservation store rejected the write".to_string(),
            ));
        }

        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id()) {
            return Err(CollaboratorError::Conflict(format!(
                "reservation {} already exists",
                reservation.id()
            )));
        }
        reservations.insert(reservation.id(), reservation.clone());
        Ok(reservation)
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, CollaboratorError> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn save(&self, reservation: &Reservation) -> Result<(), CollaboratorError> {
        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "reservation store rejected the write".to_string(),
            ));
        }

        let mut reservations = self.reservations.write().await;
        let slot = reservations
            .get_mut(&reservation.id())
            .ok_or_else(|| CollaboratorError::not_found("reservation", reservation.id()))?;
        *slot = reservation.clone();
        Ok(())
    }

    async fn cancel(&self, id: ReservationId) -> Result<Reservation, CollaboratorError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.cancel_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_on_cancel.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "reservation store is unreachable".to_string(),
            ));
        }

        // Held across the release so no other write lands in between.
        let mut reservations = self.reservations.write().await;
        let stored = reservations
            .get(&id)
            .ok_or_else(|| CollaboratorError::not_found("reservation", id))?;
        let cancelled = stored.expire(self.clock.now()).cancel();

        // Seats go first: a failed release must leave the status untouched.
        if let Some(seats) = &self.seats {
            seats.release(id).await?;
        }

        reservations.insert(id, cancelled.clone());
        Ok(cancelled)
    }
}
