//! HTTP handlers and the state they share.

pub mod reservations;
pub mod services;
pub mod system;

use std::str::FromStr;
use std::sync::Arc;

use common::Clock;
use saga::{
    AttachmentManager, CancellationSaga, CoreConfig, HoldManager, InMemoryPaymentService,
    InMemoryReservationStore, InMemorySeatInventory, InMemoryServiceBookingStore,
};

use crate::error::ApiError;

pub type Holds =
    HoldManager<InMemorySeatInventory, InMemoryReservationStore, InMemoryPaymentService>;
pub type Cancellations = CancellationSaga<InMemoryReservationStore, InMemoryServiceBookingStore>;
pub type Attachments = AttachmentManager<InMemoryServiceBookingStore>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub holds: Holds,
    pub cancellations: Cancellations,
    pub attachments: Attachments,
    /// Seat inventory behind `holds`, kept for seeding zones.
    pub inventory: InMemorySeatInventory,
    pub clock: Arc<dyn Clock>,
    pub config: CoreConfig,
}

/// Parses a path segment into a typed identifier.
pub(crate) fn parse_id<T>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} ID format: {e}")))
}
