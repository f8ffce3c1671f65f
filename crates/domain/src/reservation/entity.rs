//! Reservation entity.

use chrono::{DateTime, Utc};
use common::{EventId, ReservationId, UserId, ZoneId};
use serde::{Deserialize, Serialize};

use super::{HoldPolicy, Money, ReservationError, ReservationStatus, SeatClaim};

/// A claim on a block of seats within one zone of one event.
///
/// The seat set is fixed at creation; changing the quantity means making a
/// new reservation. Transitions never mutate in place, they return the next
/// version of the reservation so callers decide what to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    event_id: EventId,
    zone_id: ZoneId,
    user_id: UserId,
    seats: Vec<SeatClaim>,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Rejects seat quantities below one.
pub fn validate_quantity(quantity: u32) -> Result<(), ReservationError> {
    if quantity == 0 {
        return Err(ReservationError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Rejects requests for more seats than the zone currently has available.
pub fn ensure_available(requested: u32, available: u32) -> Result<(), ReservationError> {
    if requested > available {
        return Err(ReservationError::InsufficientInventory {
            requested,
            available,
        });
    }
    Ok(())
}

// Construction
impl Reservation {
    /// Creates a new hold over the given seats.
    ///
    /// The hold expires `policy.ttl()` after `created_at`.
    pub fn hold(
        id: ReservationId,
        event_id: EventId,
        zone_id: ZoneId,
        user_id: UserId,
        seats: Vec<SeatClaim>,
        created_at: DateTime<Utc>,
        policy: &HoldPolicy,
    ) -> Result<Self, ReservationError> {
        if seats.is_empty() {
            return Err(ReservationError::InvalidQuantity { quantity: 0 });
        }

        Ok(Self {
            id,
            event_id,
            zone_id,
            user_id,
            seats,
            status: ReservationStatus::Hold,
            created_at,
            expires_at: policy.expiry_for(created_at),
        })
    }
}

// Query methods
impl Reservation {
    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the claimed seats in allocation order.
    pub fn seats(&self) -> &[SeatClaim] {
        &self.seats
    }

    /// Returns the number of seats held.
    pub fn quantity(&self) -> usize {
        self.seats.len()
    }

    /// Returns the total price, always the sum of the seats' unit prices.
    pub fn total_price(&self) -> Money {
        self.seats.iter().map(|seat| seat.unit_price).sum()
    }

    /// Returns the stored status, without applying expiry.
    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the hold expiry instant. Only meaningful while the status is `Hold`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if this is a `Hold` whose expiry instant has passed.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Hold && now > self.expires_at
    }

    /// Returns true if the reservation may still be paid for at `now`.
    pub fn is_payable(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Hold && !self.is_lapsed(now)
    }
}

// Transitions (return the next version)
impl Reservation {
    /// Applies lazy expiry.
    ///
    /// A `Hold` read after its expiry instant comes back `Expired`; any other
    /// reservation comes back unchanged. Every read path runs this before a
    /// reservation is shown as payable.
    pub fn expire(&self, now: DateTime<Utc>) -> Reservation {
        let mut next = self.clone();
        if next.is_lapsed(now) {
            next.status = ReservationStatus::Expired;
        }
        next
    }

    /// Confirms a paid hold.
    ///
    /// Fails with `HoldExpired` if the hold lapsed (whether or not the lapse
    /// was already recorded) and with `InvalidTransition` for reservations
    /// that were never holdable at `now`.
    pub fn confirm(&self, now: DateTime<Utc>) -> Result<Reservation, ReservationError> {
        let current = self.expire(now);
        if current.status.can_confirm() {
            return Ok(Reservation {
                status: ReservationStatus::Confirmed,
                ..current
            });
        }
        match current.status {
            ReservationStatus::Expired => Err(ReservationError::HoldExpired {
                reservation_id: self.id,
                expired_at: self.expires_at,
            }),
            status => Err(ReservationError::InvalidTransition {
                current: status,
                action: "confirm",
            }),
        }
    }

    /// Cancels the reservation.
    ///
    /// `Hold` and `Confirmed` move to `Cancelled`. An already `Cancelled` or
    /// `Expired` reservation has nothing left to release and comes back
    /// unchanged, so repeated cancellation is never an error.
    pub fn cancel(&self) -> Reservation {
        let mut next = self.clone();
        if next.status.can_cancel() {
            next.status = ReservationStatus::Cancelled;
        }
        next
    }
}
