//! Realtime event types and channel factories.

pub mod channels;
pub mod types;

pub use channels::{RealtimeReceiver, RealtimeSender, realtime_channel};
pub use types::{RealtimeEvent, RealtimeScope, RealtimeUpdate};
