//! Collaborator traits and in-memory implementations.
//!
//! Each trait is the contract the core requires of a remote, authoritative
//! system. The in-memory implementations back the tests and the demo server
//! and support failure injection.

pub mod bookings;
pub mod inventory;
pub mod payment;
pub mod reservations;

pub use bookings::{InMemoryServiceBookingStore, ServiceBookingStore};
pub use inventory::{Allocation, InMemorySeatInventory, SeatInventory, SeatRequest};
pub use payment::{InMemoryPaymentService, PaymentConfirmation, PaymentService};
pub use reservations::{InMemoryReservationStore, ReservationStore};
