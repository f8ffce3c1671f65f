//! Complementary-service booking store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{BookingId, ReservationId, ServiceId};
use domain::{BookingStatus, ServiceBooking, find_conflict};
use tokio::sync::RwLock;

use crate::error::CollaboratorError;

/// Trait for the authoritative complementary-service booking store.
#[async_trait]
pub trait ServiceBookingStore: Send + Sync {
    /// Lists every booking of a service, across events and organizers.
    async fn list_for_service(
        &self,
        service_id: ServiceId,
    ) -> Result<Vec<ServiceBooking>, CollaboratorError>;

    /// Finds the booking that originated from a reservation.
    ///
    /// `Ok(None)` means no such booking exists.
    async fn find_by_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<ServiceBooking>, CollaboratorError>;

    /// Creates a booking.
    ///
    /// The store serializes creation per service and rejects a booking that
    /// overlaps an active one with `Conflict`, whatever pre-check the caller ran.
    async fn create(&self, booking: ServiceBooking) -> Result<ServiceBooking, CollaboratorError>;

    /// Cancels a booking. Cancelling twice is a no-op.
    async fn cancel(&self, id: BookingId) -> Result<ServiceBooking, CollaboratorError>;
}

/// In-memory booking store for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServiceBookingStore {
    bookings: Arc<RwLock<HashMap<BookingId, ServiceBooking>>>,
    fail_on_lookup: Arc<AtomicBool>,
    fail_on_cancel: Arc<AtomicBool>,
    lookup_delay_ms: Arc<AtomicU64>,
    cancel_delay_ms: Arc<AtomicU64>,
    lookup_calls: Arc<AtomicUsize>,
    cancel_calls: Arc<AtomicUsize>,
}

impl InMemoryServiceBookingStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a booking as-is, bypassing the overlap check.
    pub async fn seed(&self, booking: ServiceBooking) {
        self.bookings.write().await.insert(booking.id, booking);
    }

    /// Configures the service to fail on subsequent reservation lookups.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        self.fail_on_lookup.store(fail, Ordering::SeqCst);
    }

    /// Configures the service to fail on subsequent cancel calls.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.fail_on_cancel.store(fail, Ordering::SeqCst);
    }

    /// Delays every reservation lookup, to exercise caller timeouts.
    pub fn set_lookup_delay(&self, delay: Duration) {
        self.lookup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delays every cancel call, to exercise caller timeouts.
    pub fn set_cancel_delay(&self, delay: Duration) {
        self.cancel_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns how many reservation lookups were received.
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Returns how many cancel requests were received.
    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Returns the stored status of a booking.
    pub async fn status_of(&self, id: BookingId) -> Option<BookingStatus> {
        self.bookings.read().await.get(&id).map(|b| b.status)
    }
}

#[async_trait]
impl ServiceBookingStore for InMemoryServiceBookingStore {
    async fn list_for_service(
        &self,
        service_id: ServiceId,
    ) -> Result<Vec<ServiceBooking>, CollaboratorError> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<ServiceBooking> = bookings
            .values()
            .filter(|b| b.service_id == service_id)
            .cloned()
            .collect();
        matching.sort_by_key(|b| b.start());
        Ok(matching)
    }

    async fn find_by_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<ServiceBooking>, CollaboratorError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        pause(&self.lookup_delay_ms).await;
        if self.fail_on_lookup.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "booking store is unreachable".to_string(),
            ));
        }

        let bookings = self.bookings.read().await;
        let mut linked: Vec<&ServiceBooking> = bookings
            .values()
            .filter(|b| b.reservation_id == Some(reservation_id))
            .collect();
        // Prefer a booking that still needs cancelling.
        linked.sort_by_key(|b| !b.is_active());
        Ok(linked.first().map(|b| (*b).clone()))
    }

    async fn create(&self, booking: ServiceBooking) -> Result<ServiceBooking, CollaboratorError> {
        let mut bookings = self.bookings.write().await;

        let same_service = bookings
            .values()
            .filter(|b| b.service_id == booking.service_id);
        if let Some(existing) = find_conflict(&booking.range, same_service) {
            return Err(CollaboratorError::Conflict(format!(
                "service {} is already booked by {}",
                booking.service_id, existing.id
            )));
        }

        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn cancel(&self, id: BookingId) -> Result<ServiceBooking, CollaboratorError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        pause(&self.cancel_delay_ms).await;
        if self.fail_on_cancel.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "booking store is unreachable".to_string(),
            ));
        }

        let mut bookings = self.bookings.write().await;
        let slot = bookings
            .get_mut(&id)
            .ok_or_else(|| CollaboratorError::not_found("booking", id))?;
        *slot = slot.cancel();
        Ok(slot.clone())
    }
}

async fn pause(delay_ms: &AtomicU64) {
    let delay = delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::{EventId, OrganizerId};
    use domain::TimeRange;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 19, hour, 0, 0).unwrap()
    }

    fn booking(service_id: ServiceId, start: u32, end: u32) -> ServiceBooking {
        ServiceBooking {
            id: BookingId::new(),
            service_id,
            organizer_id: OrganizerId::new(),
            event_id: EventId::new(),
            reservation_id: None,
            range: TimeRange::new(t(start), t(end)).unwrap(),
            status: BookingStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlap_atomically() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();

        store.create(booking(service, 10, 12)).await.unwrap();
        let result = store.create(booking(service, 11, 13)).await;
        assert!(matches!(result, Err(CollaboratorError::Conflict(_))));

        // Touching the end of the first booking is fine.
        store.create(booking(service, 12, 14)).await.unwrap();
        // Another service is independent.
        store.create(booking(ServiceId::new(), 11, 13)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_for_service_is_ordered_by_start() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();
        store.create(booking(service, 15, 16)).await.unwrap();
        store.create(booking(service, 9, 10)).await.unwrap();
        store.create(booking(ServiceId::new(), 9, 10)).await.unwrap();

        let listed = store.list_for_service(service).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].start(), t(9));
        assert_eq!(listed[1].start(), t(15));
    }

    #[tokio::test]
    async fn test_find_by_reservation() {
        let store = InMemoryServiceBookingStore::new();
        let reservation_id = ReservationId::new();
        let mut linked = booking(ServiceId::new(), 10, 11);
        linked.reservation_id = Some(reservation_id);
        store.create(linked.clone()).await.unwrap();

        let found = store.find_by_reservation(reservation_id).await.unwrap();
        assert_eq!(found, Some(linked));

        let missing = store.find_by_reservation(ReservationId::new()).await.unwrap();
        assert_eq!(missing, None);
        assert_eq!(store.lookup_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_frees_slot() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();
        let first = store.create(booking(service, 10, 12)).await.unwrap();

        store.cancel(first.id).await.unwrap();
        let again = store.cancel(first.id).await.unwrap();
        assert_eq!(again.status, BookingStatus::Cancelled);

        store.create(booking(service, 10, 12)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryServiceBookingStore::new();
        store.set_fail_on_lookup(true);
        store.set_fail_on_cancel(true);

        assert!(store.find_by_reservation(ReservationId::new()).await.is_err());
        assert!(store.cancel(BookingId::new()).await.is_err());
        assert_eq!(store.cancel_calls(), 1);
    }
}
