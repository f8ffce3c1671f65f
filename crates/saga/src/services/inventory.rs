//! Seat inventory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Clock, EventId, ReservationId, SeatId, SystemClock, ZoneId};
use domain::{Money, SeatClaim};
use tokio::sync::RwLock;

use crate::error::CollaboratorError;

/// A request for a block of seats in one zone.
#[derive(Debug, Clone)]
pub struct SeatRequest {
    pub event_id: EventId,
    pub zone_id: ZoneId,
    /// Reservation the seats will be held for.
    pub reservation_id: ReservationId,
    pub quantity: u32,
    /// Instant after which the inventory may hand the seats to someone else.
    pub hold_until: DateTime<Utc>,
}

/// Result of an allocation attempt. Allocation is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Exactly the requested number of seats, now held.
    Allocated(Vec<SeatClaim>),
    /// Not enough free seats; nothing was allocated.
    Insufficient { available: u32 },
}

/// Trait for the authoritative seat/zone inventory.
///
/// The inventory owns seat availability and must serialize allocations so
/// two concurrent requests can never be handed the same seat.
#[async_trait]
pub trait SeatInventory: Send + Sync {
    /// Returns the number of seats in the zone free right now.
    async fn available_seats(
        &self,
        event_id: EventId,
        zone_id: ZoneId,
    ) -> Result<u32, CollaboratorError>;

    /// Holds `quantity` specific seats, or none at all.
    async fn allocate(&self, request: SeatRequest) -> Result<Allocation, CollaboratorError>;

    async fn commit(&self, reservation_id: ReservationId) -> Result<(), CollaboratorError>;

    /// Returns a reservation's seats to the pool. Releasing twice is a no-op.
    async fn release(&self, reservation_id: ReservationId) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatState {
    Available,
    Held {
        reservation_id: ReservationId,
        until: DateTime<Utc>,
    },
    Sold {
        reservation_id: ReservationId,
    },
}

#[derive(Debug, Clone)]
struct Seat {
    claim: SeatClaim,
    state: SeatState,
}

impl Seat {
    /// A hold whose deadline has passed no longer protects the seat.
    fn is_free(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            SeatState::Available => true,
            SeatState::Held { until, .. } => now > until,
            SeatState::Sold { .. } => false,
        }
    }

    fn belongs_to(&self, id: ReservationId) -> bool {
        match self.state {
            SeatState::Held { reservation_id, .. } | SeatState::Sold { reservation_id } => {
                reservation_id == id
            }
            SeatState::Available => false,
        }
    }
}

type ZoneKey = (EventId, ZoneId);

/// In-memory seat inventory for tests and the demo server.
#[derive(Clone)]
pub struct InMemorySeatInventory {
    zones: Arc<RwLock<HashMap<ZoneKey, Vec<Seat>>>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
    allocate_delay_ms: Arc<AtomicU64>,
    allocate_calls: Arc<AtomicUsize>,
}

impl InMemorySeatInventory {
    /// Creates an empty inventory reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            zones: Arc::default(),
            clock,
            unavailable: Arc::default(),
            allocate_delay_ms: Arc::default(),
            allocate_calls: Arc::default(),
        }
    }

    /// Adds a zone with the given `(label, price)` seats, all available.
    pub async fn add_zone<L>(
        &self,
        event_id: EventId,
        zone_id: ZoneId,
        seats: impl IntoIterator<Item = (L, Money)>,
    ) where
        L: Into<String>,
    {
        let seats = seats
            .into_iter()
            .map(|(label, price)| Seat {
                claim: SeatClaim::new(SeatId::new(), label, price),
                state: SeatState::Available,
            })
            .collect();
        self.zones.write().await.insert((event_id, zone_id), seats);
    }

    /// Makes every subsequent call fail as if the inventory were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every allocation reply. The seats are taken before the delay,
    /// so a caller that gives up early still leaves them held.
    pub fn set_allocate_delay(&self, delay: Duration) {
        self.allocate_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns how many allocation requests were received.
    pub fn allocate_calls(&self) -> usize {
        self.allocate_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of seats held (not sold) for a reservation.
    pub async fn held_for(&self, reservation_id: ReservationId) -> usize {
        self.count(|state| matches!(state, SeatState::Held { reservation_id: r, .. } if r == reservation_id))
            .await
    }

    /// Returns the number of seats sold to a reservation.
    pub async fn sold_to(&self, reservation_id: ReservationId) -> usize {
        self.count(|state| matches!(state, SeatState::Sold { reservation_id: r } if r == reservation_id))
            .await
    }

    async fn count(&self, pred: impl Fn(SeatState) -> bool) -> usize {
        self.zones
            .read()
            .await
            .values()
            .flatten()
            .filter(|seat| pred(seat.state))
            .count()
    }

    async fn take_seats(&self, request: &SeatRequest) -> Result<Allocation, CollaboratorError> {
        let now = self.clock.now();
        let mut zones = self.zones.write().await;
        let seats = zones
            .get_mut(&(request.event_id, request.zone_id))
            .ok_or_else(|| CollaboratorError::not_found("zone", request.zone_id))?;

        let free: Vec<usize> = seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_free(now))
            .map(|(index, _)| index)
            .collect();

        if free.len() < request.quantity as usize {
            return Ok(Allocation::Insufficient {
                available: free.len() as u32,
            });
        }

        let claims = free
            .into_iter()
            .take(request.quantity as usize)
            .map(|index| {
                let seat = &mut seats[index];
                seat.state = SeatState::Held {
                    reservation_id: request.reservation_id,
                    until: request.hold_until,
                };
                seat.claim.clone()
            })
            .collect();

        Ok(Allocation::Allocated(claims))
    }

    fn check_available(&self) -> Result<(), CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(
                "seat inventory is unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemorySeatInventory {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl SeatInventory for InMemorySeatInventory {
    async fn available_seats(
        &self,
        event_id: EventId,
        zone_id: ZoneId,
    ) -> Result<u32, CollaboratorError> {
        self.check_available()?;
        let now = self.clock.now();
        let zones = self.zones.read().await;
        let seats = zones
            .get(&(event_id, zone_id))
            .ok_or_else(|| CollaboratorError::not_found("zone", zone_id))?;

        Ok(seats.iter().filter(|seat| seat.is_free(now)).count() as u32)
    }

    async fn allocate(&self, request: SeatRequest) -> Result<Allocation, CollaboratorError> {
        self.allocate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let now = self.clock.now();
        let mut zones = self.zones.write().await;
        let seats = zones
            .get_mut(&(request.event_id, request.zone_id))
            .ok_or_else(|| CollaboratorError::not_found("zone", request.zone_id))?;

        let free: Vec<usize> = seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_free(now))
            .map(|(index, _)| index)
            .collect();

        if free.len() < request.quantity as usize {
            return Ok(Allocation::Insufficient {
                available: free.len() as u32,
            });
        }

        let claims = free
            .into_iter()
            .take(request.quantity as usize)
            .map(|index| {
                let seat = &mut seats[index];
                seat.state = SeatState::Held {
                    reservation_id: request.reservation_id,
                    until: request.hold_until,
                };
                seat.claim.clone()
            })
            .collect();

        Ok(Allocation::Allocated(claims))
    }

    async fn commit(&self, reservation_id: ReservationId) -> Result<(), CollaboratorError> {
        self.check_available()?;
        let mut zones = self.zones.write().await;
        let mut owned = 0;
        for seat in zones.values_mut().flatten() {
            if seat.belongs_to(reservation_id) {
                seat.state = SeatState::Sold { reservation_id };
                owned += 1;
            }
        }

        if owned == 0 {
            return Err(CollaboratorError::Conflict(format!(
                "no seats are held for reservation {reservation_id}"
            )));
        }
        Ok(())
    }

    async fn release(&self, reservation_id: ReservationId) -> Result<(), CollaboratorError> {
        self.check_available()?;
        let mut zones = self.zones.write().await;
        for seat in zones.values_mut().flatten() {
            if seat.belongs_to(reservation_id) {
                seat.state = SeatState::Available;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::ManualClock;

    struct Fixture {
        inventory: InMemorySeatInventory,
        clock: ManualClock,
        event_id: EventId,
        zone_id: ZoneId,
    }

    async fn fixture(seats: usize) -> Fixture {
        let clock = ManualClock::default();
        let inventory = InMemorySeatInventory::new(Arc::new(clock.clone()));
        let event_id = EventId::new();
        let zone_id = ZoneId::new();
        inventory
            .add_zone(
                event_id,
                zone_id,
                (1..=seats).map(|n| (format!("C-{n}"), Money::from_cents(3000))),
            )
            .await;
        Fixture {
            inventory,
            clock,
            event_id,
            zone_id,
        }
    }

    fn request(f: &Fixture, quantity: u32) -> SeatRequest {
        SeatRequest {
            event_id: f.event_id,
            zone_id: f.zone_id,
            reservation_id: ReservationId::new(),
            quantity,
            hold_until: f.clock.now() + Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn test_allocate_exact_quantity() {
        let f = fixture(3).await;
        let req = request(&f, 3);

        let Allocation::Allocated(claims) = f.inventory.allocate(req.clone()).await.unwrap() else {
            panic!("expected allocation");
        };
        assert_eq!(claims.len(), 3);
        assert_eq!(f.inventory.held_for(req.reservation_id).await, 3);
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_allocate_is_all_or_nothing() {
        let f = fixture(3).await;
        let req = request(&f, 5);

        let result = f.inventory.allocate(req.clone()).await.unwrap();
        assert_eq!(result, Allocation::Insufficient { available: 3 });
        assert_eq!(f.inventory.held_for(req.reservation_id).await, 0);
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_lapsed_hold_frees_seats() {
        let f = fixture(2).await;
        f.inventory.allocate(request(&f, 2)).await.unwrap();
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            0
        );

        f.clock.advance(Duration::minutes(16));
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_commit_and_release() {
        let f = fixture(2).await;
        let req = request(&f, 2);
        f.inventory.allocate(req.clone()).await.unwrap();

        f.inventory.commit(req.reservation_id).await.unwrap();
        f.inventory.commit(req.reservation_id).await.unwrap();
        assert_eq!(f.inventory.sold_to(req.reservation_id).await, 2);

        // Sold seats stay taken even after the hold deadline.
        f.clock.advance(Duration::hours(1));
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            0
        );

        f.inventory.release(req.reservation_id).await.unwrap();
        f.inventory.release(req.reservation_id).await.unwrap();
        assert_eq!(
            f.inventory
                .available_seats(f.event_id, f.zone_id)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_commit_without_held_seats_is_conflict() {
        let f = fixture(1).await;
        let result = f.inventory.commit(ReservationId::new()).await;
        assert!(matches!(result, Err(CollaboratorError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unknown_zone_is_not_found() {
        let f = fixture(1).await;
        let result = f.inventory.available_seats(f.event_id, ZoneId::new()).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unavailable_inventory() {
        let f = fixture(1).await;
        f.inventory.set_unavailable(true);
        let result = f.inventory.allocate(request(&f, 1)).await;
        assert!(matches!(result, Err(CollaboratorError::Unavailable(_))));
        assert_eq!(f.inventory.allocate_calls(), 1);
    }

    #[tokio::test]
    async fn test_delayed_allocation_still_takes_seats() {
        let f = fixture(2).await;
        f.inventory.set_allocate_delay(std::time::Duration::from_secs(2));
        let req = request(&f, 2);

        let call = f.inventory.allocate(req.clone());
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), call).await;

        assert!(timed_out.is_err());
        assert_eq!(f.inventory.held_for(req.reservation_id).await, 2);
    }
}
