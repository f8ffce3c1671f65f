//! Orchestration layer for the reservation core.
//!
//! Drives the remote collaborators (seat inventory, reservation store,
//! service booking store, payments) through the domain rules:
//!
//! - [`HoldManager`]: create holds, read them with lazy expiry, confirm paid holds
//! - [`AttachmentManager`]: book complementary services without double booking
//! - [`CancellationSaga`]: cancel a reservation, then its dependent booking
//!
//! Every collaborator call is bounded by [`CoreConfig::call_timeout`].

pub mod attachment;
pub mod cancellation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hold;
pub mod outcome;
pub mod services;
pub mod timeout;

pub use attachment::AttachmentManager;
pub use config::CoreConfig;
pub use coordinator::CancellationSaga;
pub use error::{CollaboratorError, SagaError};
pub use hold::{CreateHold, HoldManager};
pub use outcome::{CancellationFailure, CancellationOutcome, PartialFailure};
pub use services::{
    Allocation, InMemoryPaymentService, InMemoryReservationStore, InMemorySeatInventory,
    InMemoryServiceBookingStore, PaymentConfirmation, PaymentService, ReservationStore,
    SeatInventory, SeatRequest, ServiceBookingStore,
};
