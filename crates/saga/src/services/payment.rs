//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ReservationId, UserId};
use domain::Money;
use tokio::sync::RwLock;

use crate::error::CollaboratorError;

/// Notice from the payment collaborator that a held reservation was paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub reservation_id: ReservationId,
    /// Payment reference assigned by the payment service.
    pub payment_id: String,
    pub amount: Money,
    pub confirmed_at: DateTime<Utc>,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges a user for a held reservation.
    async fn charge(
        &self,
        reservation_id: ReservationId,
        user_id: UserId,
        amount: Money,
    ) -> Result<PaymentConfirmation, CollaboratorError>;

    /// Refunds a previously made payment.
    async fn refund(&self, payment_id: &str) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (ReservationId, UserId, Money)>,
    refunded: Vec<String>,
    next_id: u32,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
    fail_on_charge: Arc<AtomicBool>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline subsequent charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.fail_on_charge.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of payments that were not refunded.
    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Returns the references of refunded payments, in refund order.
    pub async fn refunded(&self) -> Vec<String> {
        self.state.read().await.refunded.clone()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(
        &self,
        reservation_id: ReservationId,
        user_id: UserId,
        amount: Money,
    ) -> Result<PaymentConfirmation, CollaboratorError> {
        if self.fail_on_charge.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Conflict("payment declined".to_string()));
        }

        let mut state = self.state.write().await;
        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(payment_id.clone(), (reservation_id, user_id, amount));

        Ok(PaymentConfirmation {
            reservation_id,
            payment_id,
            amount,
            confirmed_at: Utc::now(),
        })
    }

    async fn refund(&self, payment_id: &str) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().await;
        if state.payments.remove(payment_id).is_some() {
            state.refunded.push(payment_id.to_string());
        }
        Ok(())
    }
}
