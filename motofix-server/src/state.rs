//! Application state shared across all request handlers.

use motofix_core::events::RealtimeSender;
use motofix_core::stores::PgInboxStore;
use sqlx::PgPool;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Inbox store the ingestion endpoint appends to.
    pub inbox: PgInboxStore,
    /// Broadcast sender feeding the WebSocket endpoint.
    pub realtime_tx: RealtimeSender,
}

impl AppState {
    pub fn new(db: PgPool, inbox: PgInboxStore, realtime_tx: RealtimeSender) -> Self {
        Self {
            db,
            inbox,
            realtime_tx,
        }
    }
}
