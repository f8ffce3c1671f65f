//! Complementary-service booking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{EventId, OrganizerId, ReservationId, ServiceId};
use domain::{AttachmentRequest, EventWindow, ServiceBooking};
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AttachServiceRequest {
    pub event_id: EventId,
    pub organizer_id: OrganizerId,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub event_window: EventWindow,
}

/// POST /services/{service_id}/bookings
#[tracing::instrument(skip(state, req))]
pub async fn attach(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Json(req): Json<AttachServiceRequest>,
) -> Result<(StatusCode, Json<ServiceBooking>), ApiError> {
    let request = AttachmentRequest {
        service_id: parse_id("service", &service_id)?,
        event_id: req.event_id,
        organizer_id: req.organizer_id,
        reservation_id: req.reservation_id,
        start: req.start,
        end: req.end,
        event_window: req.event_window,
    };
    let booking = state.attachments.attach_service(request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /services/{service_id}/bookings
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Result<Json<Vec<ServiceBooking>>, ApiError> {
    let service_id: ServiceId = parse_id("service", &service_id)?;
    let bookings = state.attachments.bookings_for_service(service_id).await?;
    Ok(Json(bookings))
}
