use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier is a distinct type so a `ZoneId` can never be passed
/// where a `ReservationId` is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a ticket reservation (hold or purchase).
    ReservationId
);
uuid_id!(
    /// Identifier of an event (concert, match, conference...).
    EventId
);
uuid_id!(
    /// Identifier of a seating zone within an event.
    ZoneId
);
uuid_id!(
    /// Identifier of a single seat in a zone.
    SeatId
);
uuid_id!(
    /// Identifier of the end user requesting a reservation.
    UserId
);
uuid_id!(
    /// Identifier of a complementary service resource (catering, transport...).
    ServiceId
);
uuid_id!(
    /// Identifier of a complementary-service booking.
    BookingId
);
uuid_id!(
    /// Identifier of the organizer who books complementary services.
    OrganizerId
);
