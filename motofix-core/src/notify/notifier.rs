//! Dual-channel notifier.
//!
//! Every notification goes out on two independent, best-effort channels:
//! a push message to the owner's registered device and a realtime update
//! on the broadcast channel feeding the WebSocket endpoint. A failure on
//! one channel is logged and does not stop the other, and neither failure
//! reaches the caller as an error; callers that need delivery decide what
//! to do with the returned per-channel outcome (the inbox path relies on
//! event replay, the sweep path on the next cycle).

use super::push::{PushMessage, PushSender};
use crate::events::{RealtimeEvent, RealtimeScope, RealtimeSender, RealtimeUpdate};
use tracing::{debug, warn};

/// What happened on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Delivered,
    /// The channel had nowhere to deliver (no device token, no connected
    /// subscriber). A no-op, not an error.
    Skipped,
    Failed,
}

/// Per-channel outcome of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub push: ChannelStatus,
    pub realtime: ChannelStatus,
}

impl NotifyOutcome {
    /// True iff no channel reported an actual failure. Skips count as
    /// clean: absence of a token is a silent no-op by contract.
    pub fn clean(&self) -> bool {
        self.push != ChannelStatus::Failed && self.realtime != ChannelStatus::Failed
    }
}

pub struct Notifier<P> {
    push: P,
    realtime_tx: RealtimeSender,
}

impl<P> Clone for Notifier<P>
where
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            push: self.push.clone(),
            realtime_tx: self.realtime_tx.clone(),
        }
    }
}

impl<P: PushSender> Notifier<P> {
    pub fn new(push: P, realtime_tx: RealtimeSender) -> Self {
        Self { push, realtime_tx }
    }

    /// Fire both channels for one logical event. `scope` decides which
    /// sockets see the realtime update; the push message goes to
    /// `device_token` when present.
    pub async fn notify(
        &self,
        scope: RealtimeScope,
        device_token: Option<&str>,
        event: RealtimeEvent,
        message: PushMessage,
    ) -> NotifyOutcome {
        let push = match device_token {
            None => {
                debug!(?scope, "no device token registered, skipping push");
                ChannelStatus::Skipped
            }
            Some(token) => match self.push.send(token, &message).await {
                Ok(()) => ChannelStatus::Delivered,
                Err(e) => {
                    warn!(error = %e, "push delivery failed");
                    ChannelStatus::Failed
                }
            },
        };

        // `send` only errors when no subscriber is connected, which is the
        // normal idle state, not a delivery failure. Per-socket write
        // errors are handled by the WebSocket tasks themselves.
        let realtime = match self.realtime_tx.send(RealtimeUpdate { scope, event }) {
            Ok(receivers) => {
                debug!(receivers, "realtime update broadcast");
                ChannelStatus::Delivered
            }
            Err(_) => {
                debug!("no realtime subscribers connected");
                ChannelStatus::Skipped
            }
        };

        NotifyOutcome { push, realtime }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Push-channel stand-ins shared by the processor tests.

    use super::*;
    use crate::notify::push::PushError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// Records every send; optionally fails each one.
    #[derive(Clone, Default)]
    pub struct RecordingPushSender {
        pub sent: Arc<Mutex<Vec<(String, PushMessage)>>>,
        pub fail: Arc<std::sync::atomic::AtomicBool>,
        pub send_count: Arc<AtomicUsize>,
    }

    impl RecordingPushSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let sender = Self::default();
            sender.fail.store(true, Ordering::SeqCst);
            sender
        }

        pub fn count(&self) -> usize {
            self.send_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PushSender for RecordingPushSender {
        async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(PushError::Rejected {
                    status: 503,
                    body: "gateway unavailable".into(),
                });
            }
            self.sent
                .lock()
                .await
                .push((device_token.to_string(), message.clone()));
            Ok(())
        }
    }

    pub fn order_ready_message(order_id: Uuid) -> PushMessage {
        PushMessage {
            kind: "order".into(),
            title: "Order ready".into(),
            body: "Your vehicle is ready for pickup.".into(),
            entity_key: "repair-order".into(),
            entity_id: order_id.to_string(),
            screen: "OrderDetail".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::test_support::{RecordingPushSender, order_ready_message};
    use super::*;
    use crate::events::realtime_channel;
    use uuid::Uuid;

    #[tokio::test]
    async fn both_channels_fire_independently() {
        let (tx, mut rx) = realtime_channel();
        let push = RecordingPushSender::new();
        let notifier = Notifier::new(push.clone(), tx);

        let owner = Uuid::from_u128(9);
        let order_id = Uuid::from_u128(10);
        let outcome = notifier
            .notify(
                RealtimeScope::User(owner),
                Some("token-1"),
                RealtimeEvent::OrderCompleted { order_id },
                order_ready_message(order_id),
            )
            .await;

        assert_eq!(outcome.push, ChannelStatus::Delivered);
        assert_eq!(outcome.realtime, ChannelStatus::Delivered);
        assert!(outcome.clean());

        let update = rx.recv().await.unwrap();
        assert_eq!(update.event, RealtimeEvent::OrderCompleted { order_id });
        assert!(update.scope.includes(owner));

        let sent = push.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "token-1");
    }

    #[tokio::test]
    async fn push_failure_does_not_stop_realtime() {
        let (tx, mut rx) = realtime_channel();
        let notifier = Notifier::new(RecordingPushSender::failing(), tx);

        let order_id = Uuid::from_u128(3);
        let outcome = notifier
            .notify(
                RealtimeScope::All,
                Some("token-1"),
                RealtimeEvent::OrderPaid { order_id },
                order_ready_message(order_id),
            )
            .await;

        assert_eq!(outcome.push, ChannelStatus::Failed);
        assert_eq!(outcome.realtime, ChannelStatus::Delivered);
        assert!(!outcome.clean());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn missing_token_is_a_silent_no_op() {
        let (tx, _rx) = realtime_channel();
        let push = RecordingPushSender::new();
        let notifier = Notifier::new(push.clone(), tx);

        let order_id = Uuid::from_u128(4);
        let outcome = notifier
            .notify(
                RealtimeScope::All,
                None,
                RealtimeEvent::OrderPaid { order_id },
                order_ready_message(order_id),
            )
            .await;

        assert_eq!(outcome.push, ChannelStatus::Skipped);
        assert!(outcome.clean());
        assert_eq!(push.count(), 0);
    }

    #[tokio::test]
    async fn no_subscribers_is_a_skip_not_a_failure() {
        let (tx, rx) = realtime_channel();
        drop(rx);
        let notifier = Notifier::new(RecordingPushSender::new(), tx);

        let order_id = Uuid::from_u128(5);
        let outcome = notifier
            .notify(
                RealtimeScope::All,
                None,
                RealtimeEvent::OrderPaid { order_id },
                order_ready_message(order_id),
            )
            .await;

        assert_eq!(outcome.realtime, ChannelStatus::Skipped);
        assert!(outcome.clean());
    }
}
