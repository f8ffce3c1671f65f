//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{BookingError, ReservationError};
use saga::{CollaboratorError, SagaError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error from the reservation core.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::Reservation(reservation_err) => match reservation_err {
            ReservationError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            ReservationError::InsufficientInventory { .. }
            | ReservationError::HoldExpired { .. }
            | ReservationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        },
        SagaError::Booking(booking_err) => match booking_err {
            BookingError::InvalidInterval { .. } | BookingError::OutsideEventWindow { .. } => {
                StatusCode::BAD_REQUEST
            }
            BookingError::SchedulingConflict { .. } => StatusCode::CONFLICT,
        },
        SagaError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::PaymentMismatch { .. } => StatusCode::BAD_REQUEST,
        SagaError::Collaborator(collaborator_err) => match collaborator_err {
            CollaboratorError::NotFound { .. } => StatusCode::NOT_FOUND,
            CollaboratorError::Conflict(_) => StatusCode::CONFLICT,
            CollaboratorError::Unavailable(_) => {
                tracing::error!(error = %err, "collaborator unavailable");
                StatusCode::BAD_GATEWAY
            }
            CollaboratorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        },
    };
    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
