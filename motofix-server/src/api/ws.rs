//! `GET /ws/{user_id}` — realtime notification stream.
//!
//! Upgrades the HTTP connection to a WebSocket and forwards realtime
//! updates whose scope includes the given user. Updates are serialized as
//! `{"event": ..., "payload": ...}` text frames.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use motofix_core::events::RealtimeReceiver;
use uuid::Uuid;

use crate::state::AppState;

pub(super) async fn realtime_ws(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no update published during
    // the handshake is missed.
    let realtime_rx = state.realtime_tx.subscribe();
    ws.on_upgrade(move |socket| handle_realtime_ws(socket, realtime_rx, user_id))
}

/// Background task that drives a single WebSocket connection.
///
/// Relays scoped updates until the broadcast channel closes or the client
/// disconnects. A lagged receiver logs a warning and keeps going; dropped
/// updates are recovered by the next sweep cycle.
async fn handle_realtime_ws(mut socket: WebSocket, mut realtime_rx: RealtimeReceiver, user_id: Uuid) {
    loop {
        tokio::select! {
            result = realtime_rx.recv() => {
                match result {
                    Ok(update) if update.scope.includes(user_id) => {
                        if send_json(&mut socket, &update.event).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            %user_id,
                            skipped = n,
                            "WS: realtime receiver lagged"
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        return;
                    }
                    Some(Ok(_)) => {
                    }
                    Some(Err(_)) => {
                        return;
                    }
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
