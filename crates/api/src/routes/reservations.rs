//! Hold, confirmation, checkout, and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{EventId, ReservationId, SeatId, UserId, ZoneId};
use domain::{Money, Reservation, ReservationStatus};
use saga::{CancellationOutcome, CreateHold, PaymentConfirmation};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateHoldRequest {
    pub user_id: UserId,
    pub quantity: u32,
}

/// Body of the payment collaborator's success callback.
#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub payment_id: String,
    pub amount_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub event_id: EventId,
    pub zone_id: ZoneId,
    pub available: u32,
}

#[derive(Serialize)]
pub struct SeatResponse {
    pub seat_id: SeatId,
    pub label: String,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub event_id: EventId,
    pub zone_id: ZoneId,
    pub user_id: UserId,
    pub status: ReservationStatus,
    pub seats: Vec<SeatResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether the hold can still be paid for.
    pub payable: bool,
}

impl ReservationResponse {
    fn new(reservation: &Reservation, now: DateTime<Utc>) -> Self {
        Self {
            id: reservation.id(),
            event_id: reservation.event_id(),
            zone_id: reservation.zone_id(),
            user_id: reservation.user_id(),
            status: reservation.status(),
            seats: reservation
                .seats()
                .iter()
                .map(|seat| SeatResponse {
                    seat_id: seat.seat_id,
                    label: seat.label.clone(),
                    unit_price_cents: seat.unit_price.cents(),
                })
                .collect(),
            total_cents: reservation.total_price().cents(),
            created_at: reservation.created_at(),
            expires_at: reservation.expires_at(),
            payable: reservation.is_payable(now),
        }
    }
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub outcome: &'static str,
    pub reason_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub needs_manual_review: bool,
    pub message: &'static str,
}

impl From<&CancellationOutcome> for CancellationResponse {
    fn from(outcome: &CancellationOutcome) -> Self {
        Self {
            outcome: outcome.kind(),
            reason_code: outcome.reason_code(),
            reason: outcome.detail().map(str::to_string),
            needs_manual_review: outcome.needs_manual_review(),
            message: outcome.user_message(),
        }
    }
}

// -- Handlers --

/// GET /events/{event_id}/zones/{zone_id}/availability
#[tracing::instrument(skip(state))]
pub async fn availability(
    State(state): State<Arc<AppState>>,
    Path((event_id, zone_id)): Path<(String, String)>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let event_id: EventId = parse_id("event", &event_id)?;
    let zone_id: ZoneId = parse_id("zone", &zone_id)?;
    let available = state.holds.availability(event_id, zone_id).await?;

    Ok(Json(AvailabilityResponse {
        event_id,
        zone_id,
        available,
    }))
}

/// POST /events/{event_id}/zones/{zone_id}/holds
#[tracing::instrument(skip(state, req))]
pub async fn create_hold(
    State(state): State<Arc<AppState>>,
    Path((event_id, zone_id)): Path<(String, String)>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let cmd = CreateHold {
        event_id: parse_id("event", &event_id)?,
        zone_id: parse_id("zone", &zone_id)?,
        user_id: req.user_id,
        quantity: req.quantity,
    };
    let reservation = state.holds.create_hold(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::new(&reservation, state.clock.now())),
    ))
}

/// GET /reservations/{id}: the reservation with lazy expiry applied.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id: ReservationId = parse_id("reservation", &id)?;
    let reservation = state.holds.get_reservation(id).await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}

/// POST /reservations/{id}/confirm: payment success callback.
#[tracing::instrument(skip(state, req))]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    if req.payment_id.trim().is_empty() {
        return Err(ApiError::BadRequest("payment_id is required".to_string()));
    }

    let confirmation = PaymentConfirmation {
        reservation_id: parse_id("reservation", &id)?,
        payment_id: req.payment_id,
        amount: Money::from_cents(req.amount_cents),
        confirmed_at: state.clock.now(),
    };
    let reservation = state.holds.confirm(confirmation).await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}

/// POST /reservations/{id}/checkout: charge and confirm in one step.
#[tracing::instrument(skip(state))]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id: ReservationId = parse_id("reservation", &id)?;
    let reservation = state.holds.checkout(id).await?;
    Ok(Json(ReservationResponse::new(&reservation, state.clock.now())))
}

/// POST /reservations/{id}/cancel: runs the cancellation saga.
///
/// A partial failure still answers 200: the reservation is cancelled and
/// the body says the linked booking needs review.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CancellationResponse>), ApiError> {
    let id: ReservationId = parse_id("reservation", &id)?;
    let outcome = state.cancellations.cancel(id).await;

    let status = if outcome.reservation_cancelled() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(CancellationResponse::from(&outcome))))
}
