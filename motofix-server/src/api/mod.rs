//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /webhooks/payment` – provider callback ingestion
//! - `GET  /ws/{user_id}`     – realtime notification stream

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod webhook;
mod ws;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/payment", post(webhook::receive_payment_callback))
        .route("/ws/{user_id}", get(ws::realtime_ws))
}
