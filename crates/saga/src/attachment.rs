//! Service attachment manager.

use std::time::Duration;

use common::{BookingId, ServiceId};
use domain::{AttachmentRequest, BookingError, ServiceBooking};

use crate::error::{CollaboratorError, Result, SagaError};
use crate::services::ServiceBookingStore;
use crate::timeout::bounded;

/// Books complementary services into event schedules.
pub struct AttachmentManager<B: ServiceBookingStore> {
    bookings: B,
    call_timeout: Duration,
}

impl<B: ServiceBookingStore> AttachmentManager<B> {
    pub fn new(bookings: B, call_timeout: Duration) -> Self {
        Self {
            bookings,
            call_timeout,
        }
    }

    /// Attaches a service to an event for `[start, end)`.
    ///
    /// Validation errors are returned before any collaborator call. The
    /// overlap check here is a pre-check; the store's own atomic check is
    /// what rules out double booking under concurrent requests.
    #[tracing::instrument(skip(self, request), fields(service_id = %request.service_id, event_id = %request.event_id))]
    pub async fn attach_service(&self, request: AttachmentRequest) -> Result<ServiceBooking> {
        let result = self.try_attach(request).await;
        let label = match &result {
            Ok(_) => "attached",
            Err(SagaError::Booking(BookingError::SchedulingConflict { .. })) => "conflict",
            Err(SagaError::Booking(_)) => "invalid",
            Err(_) => "error",
        };
        metrics::counter!("service_attachments_total", "result" => label).increment(1);
        match &result {
            Ok(booking) => tracing::info!(booking_id = %booking.id, "service attached"),
            Err(err) => tracing::info!(error = %err, "service attachment rejected"),
        }
        result
    }

    async fn try_attach(&self, request: AttachmentRequest) -> Result<ServiceBooking> {
        let range = request.validate()?;

        let existing = self.bookings_for_service(request.service_id).await?;
        request.check_conflicts(&range, &existing)?;

        let service_id = request.service_id;
        let booking = request.into_booking(BookingId::new(), range);
        match bounded(
            "service_bookings.create",
            self.call_timeout,
            self.bookings.create(booking),
        )
        .await
        {
            Ok(created) => Ok(created),
            // Lost a race with a concurrent booking of the same slot.
            Err(CollaboratorError::Conflict(_)) => Err(BookingError::SchedulingConflict {
                service_id,
                conflicting: None,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists every booking of a service, active or cancelled.
    pub async fn bookings_for_service(&self, service_id: ServiceId) -> Result<Vec<ServiceBooking>> {
        let bookings = bounded(
            "service_bookings.list_for_service",
            self.call_timeout,
            self.bookings.list_for_service(service_id),
        )
        .await?;
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::{EventId, OrganizerId};
    use domain::{BookingStatus, EventWindow, TimeRange};

    use crate::services::InMemoryServiceBookingStore;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 4, hour, 0, 0).unwrap()
    }

    fn request(service_id: ServiceId, start: u32, end: u32) -> AttachmentRequest {
        AttachmentRequest {
            service_id,
            event_id: EventId::new(),
            organizer_id: OrganizerId::new(),
            reservation_id: None,
            start: t(start),
            end: t(end),
            event_window: EventWindow {
                start: t(8),
                end: t(23),
            },
        }
    }

    fn manager(store: &InMemoryServiceBookingStore) -> AttachmentManager<InMemoryServiceBookingStore> {
        AttachmentManager::new(store.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_attach_creates_active_booking() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();

        let booking = manager(&store)
            .attach_service(request(service, 18, 20))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(booking.start(), t(18));
        assert_eq!(store.status_of(booking.id).await, Some(BookingStatus::Active));
    }

    #[tokio::test]
    async fn test_overlap_with_other_organizer_is_conflict() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();
        let manager = manager(&store);
        let first = manager.attach_service(request(service, 18, 20)).await.unwrap();

        let err = manager
            .attach_service(request(service, 19, 21))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Booking(BookingError::SchedulingConflict { conflicting: Some(id), .. })
                if id == first.id
        ));
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_the_slot() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();
        let manager = manager(&store);
        let first = manager.attach_service(request(service, 18, 20)).await.unwrap();
        store.cancel(first.id).await.unwrap();

        let second = manager.attach_service(request(service, 18, 20)).await;
        assert!(second.is_ok());
        assert_eq!(manager.bookings_for_service(service).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let store = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();

        let mut late = request(service, 21, 22);
        late.event_window.end = t(21);
        let err = manager(&store).attach_service(late).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::Booking(BookingError::OutsideEventWindow { .. })
        ));

        let err = manager(&store)
            .attach_service(request(service, 20, 20))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SagaError::Booking(BookingError::InvalidInterval { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_side_conflict_maps_to_scheduling_conflict() {
        // A booking the pre-check cannot see yet is still rejected by the store.
        #[derive(Clone)]
        struct RacingStore {
            inner: InMemoryServiceBookingStore,
        }

        #[async_trait::async_trait]
        impl ServiceBookingStore for RacingStore {
            async fn list_for_service(
                &self,
                _service_id: ServiceId,
            ) -> std::result::Result<Vec<ServiceBooking>, CollaboratorError> {
                Ok(Vec::new())
            }

            async fn find_by_reservation(
                &self,
                reservation_id: common::ReservationId,
            ) -> std::result::Result<Option<ServiceBooking>, CollaboratorError> {
                self.inner.find_by_reservation(reservation_id).await
            }

            async fn create(
                &self,
                booking: ServiceBooking,
            ) -> std::result::Result<ServiceBooking, CollaboratorError> {
                self.inner.create(booking).await
            }

            async fn cancel(
                &self,
                id: BookingId,
            ) -> std::result::Result<ServiceBooking, CollaboratorError> {
                self.inner.cancel(id).await
            }
        }

        let inner = InMemoryServiceBookingStore::new();
        let service = ServiceId::new();
        inner
            .seed(ServiceBooking {
                id: BookingId::new(),
                service_id: service,
                organizer_id: OrganizerId::new(),
                event_id: EventId::new(),
                reservation_id: None,
                range: TimeRange::new(t(18), t(20)).unwrap(),
                status: BookingStatus::Active,
            })
            .await;

        let manager = AttachmentManager::new(RacingStore { inner }, Duration::from_secs(1));
        let err = manager
            .attach_service(request(service, 19, 21))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Booking(BookingError::SchedulingConflict {
                conflicting: None,
                ..
            })
        ));
    }
}
