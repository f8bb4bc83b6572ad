//! Channel factory for realtime updates.

use super::types::RealtimeUpdate;
use tokio::sync::broadcast;

/// Enough buffer to absorb bursts; slow WebSocket consumers observe a
/// `Lagged` error and catch up rather than blocking producers.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for realtime updates.
pub type RealtimeSender = broadcast::Sender<RealtimeUpdate>;
/// Receiver handle for realtime updates.
pub type RealtimeReceiver = broadcast::Receiver<RealtimeUpdate>;

/// Create the realtime broadcast channel shared by the notifier and the
/// WebSocket endpoint.
pub fn realtime_channel() -> (RealtimeSender, RealtimeReceiver) {
    broadcast::channel(DEFAULT_CHANNEL_BUFFER)
}
