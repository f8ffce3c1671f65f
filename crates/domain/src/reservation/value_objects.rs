//! Value objects for the reservation domain.

use chrono::{DateTime, Duration, Utc};
use common::SeatId;
use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A single seat claimed by a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatClaim {
    /// Seat identifier in the zone inventory.
    pub seat_id: SeatId,

    /// Human-readable label, e.g. `"B-14"`.
    pub label: String,

    /// Price of this seat at the time it was held.
    pub unit_price: Money,
}

impl SeatClaim {
    /// Creates a new seat claim.
    pub fn new(seat_id: SeatId, label: impl Into<String>, unit_price: Money) -> Self {
        Self {
            seat_id,
            label: label.into(),
            unit_price,
        }
    }
}

/// Policy governing how long a hold stays payable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldPolicy {
    ttl: Duration,
}

impl HoldPolicy {
    /// Default hold lifetime in minutes.
    pub const DEFAULT_TTL_MINUTES: i64 = 15;

    /// Creates a policy with the given hold lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Returns the hold lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the expiry instant of a hold created at `created_at`.
    pub fn expiry_for(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.ttl
    }
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(Self::DEFAULT_TTL_MINUTES))
    }
}
