//! `POST /webhooks/payment` — provider callback ingestion.
//!
//! The handler's only job is to append the raw body to the inbox; parsing
//! and validation happen later, inside the processing loop, so a malformed
//! callback is recorded rather than dropped at the door.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use motofix_core::stores::InboxStore;
use serde_json::json;

use crate::state::AppState;

pub(super) async fn receive_payment_callback(
    State(state): State<AppState>,
    body: String,
) -> impl IntoResponse {
    match state.inbox.enqueue(body).await {
        Ok(record) => {
            tracing::debug!(inbox_id = record.id, "provider callback enqueued");
            (StatusCode::OK, Json(json!({ "received": true }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to enqueue provider callback");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}
