//! HTTP and WebSocket surface consumed by the UI layer. Snapshot reads
//! delegate to the record store; live delivery goes through the hub.

pub mod error;
pub mod rest;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // SOS operations
        .route("/sos", post(rest::sos::create_sos))
        .route("/sos/accept", post(rest::sos::accept_sos))
        .route("/sos/update-location", post(rest::sos::update_location))
        .route("/sos/resolve", post(rest::sos::resolve_sos))
        .route("/sos/expire", post(rest::sos::expire_sos))
        .route("/sos-alerts", get(rest::sos::list_sos))
        // Hazard alert snapshots
        .route("/alerts", get(rest::alerts::list_alerts))
        .route("/disasters", get(rest::alerts::list_disasters))
        // Live subscription channel
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
