//! Realtime event definitions.
//!
//! Events carry identifiers, not aggregate state; subscribers that need
//! fresh data fetch it themselves.

use serde::Serialize;
use uuid::Uuid;

/// A named realtime event, serialized as `{"event": ..., "payload": ...}`
/// on the WebSocket wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum RealtimeEvent {
    #[serde(rename_all = "camelCase")]
    OrderPaid { order_id: Uuid },
    #[serde(rename_all = "camelCase")]
    OrderCompleted { order_id: Uuid },
}

/// Who should see an event. Call sites decide the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeScope {
    /// Only sockets authenticated as this user.
    User(Uuid),
    /// Every connected client.
    All,
}

impl RealtimeScope {
    pub fn includes(&self, user_id: Uuid) -> bool {
        match self {
            RealtimeScope::User(owner) => *owner == user_id,
            RealtimeScope::All => true,
        }
    }
}

/// An event paired with its delivery scope, as carried on the broadcast
/// channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeUpdate {
    pub scope: RealtimeScope,
    pub event: RealtimeEvent,
}
