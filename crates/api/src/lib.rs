//! HTTP API for the ticket reservation core.
//!
//! Exposes holds, payment confirmation, cancellation, and service
//! attachment over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::{Clock, SystemClock};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    AttachmentManager, CancellationSaga, CoreConfig, HoldManager, InMemoryPaymentService,
    InMemoryReservationStore, InMemorySeatInventory, InMemoryServiceBookingStore,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route(
            "/events/{event_id}/zones/{zone_id}/availability",
            get(routes::reservations::availability),
        )
        .route(
            "/events/{event_id}/zones/{zone_id}/holds",
            post(routes::reservations::create_hold),
        )
        .route("/reservations/{id}", get(routes::reservations::get))
        .route(
            "/reservations/{id}/confirm",
            post(routes::reservations::confirm),
        )
        .route(
            "/reservations/{id}/checkout",
            post(routes::reservations::checkout),
        )
        .route("/reservations/{id}/cancel", post(routes::reservations::cancel))
        .route(
            "/services/{service_id}/bookings",
            post(routes::services::attach).get(routes::services::list),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over in-memory collaborators and the system clock.
pub fn create_default_state(config: CoreConfig) -> Arc<AppState> {
    create_state(config, Arc::new(SystemClock))
}

/// Creates application state over in-memory collaborators reading `clock`.
pub fn create_state(config: CoreConfig, clock: Arc<dyn Clock>) -> Arc<AppState> {
    let inventory = InMemorySeatInventory::new(clock.clone());
    let reservations = InMemoryReservationStore::new()
        .with_seat_inventory(inventory.clone())
        .with_clock(clock.clone());
    let bookings = InMemoryServiceBookingStore::new();
    let payments = InMemoryPaymentService::new();

    let holds = HoldManager::new(
        inventory.clone(),
        reservations.clone(),
        payments,
        clock.clone(),
        config,
    );
    let cancellations = CancellationSaga::new(reservations, bookings.clone(), config.call_timeout);
    let attachments = AttachmentManager::new(bookings, config.call_timeout);

    Arc::new(AppState {
        holds,
        cancellations,
        attachments,
        inventory,
        clock,
        config,
    })
}
