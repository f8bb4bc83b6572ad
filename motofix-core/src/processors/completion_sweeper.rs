//! CompletionSweeper.
//!
//! Scans for repair orders that satisfy the notify-worthy predicate
//! (completed, not archived, not cancelled) and pushes an "order completed"
//! notification to each owner, at most once per dedup TTL window. The
//! marker is written only when the notifier reported no channel failure,
//! so a failed send is retried on the next cycle rather than silenced for
//! a whole day.

use crate::entities::repair_orders::CompletedOrder;
use crate::events::{RealtimeEvent, RealtimeScope};
use crate::notify::{DedupCache, Notifier, PushMessage, PushSender, dedup_key};
use crate::stores::{RepairOrderStore, StoreError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

const ENTITY_KIND: &str = "repair-order";
const EVENT_KIND: &str = "completed";

/// Counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: u32,
    pub notified: u32,
    pub suppressed: u32,
    pub failed: u32,
}

/// CompletionSweeper drives the notifier + dedup cache pair.
pub struct CompletionSweeper<O, P, C> {
    orders: O,
    notifier: Notifier<P>,
    cache: C,
    dedup_ttl: Duration,
}

impl<O, P, C> Clone for CompletionSweeper<O, P, C>
where
    O: Clone,
    P: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            notifier: self.notifier.clone(),
            cache: self.cache.clone(),
            dedup_ttl: self.dedup_ttl,
        }
    }
}

impl<O, P, C> CompletionSweeper<O, P, C>
where
    O: RepairOrderStore,
    P: PushSender,
    C: DedupCache,
{
    pub fn new(orders: O, notifier: Notifier<P>, cache: C, dedup_ttl: Duration) -> Self {
        Self {
            orders,
            notifier,
            cache,
            dedup_ttl,
        }
    }

    /// One sweep pass. Both scheduler flavors delegate here.
    pub async fn run_once(&self) -> Result<SweepStats, StoreError> {
        let orders = self.orders.completed_unarchived().await?;
        let mut stats = SweepStats::default();

        for order in orders {
            stats.scanned += 1;
            let key = dedup_key(ENTITY_KIND, EVENT_KIND, order.id);
            if self.cache.exists(&key).await {
                stats.suppressed += 1;
                continue;
            }

            let outcome = self
                .notifier
                .notify(
                    RealtimeScope::User(order.owner_user_id),
                    order.device_token.as_deref(),
                    RealtimeEvent::OrderCompleted { order_id: order.id },
                    completed_message(&order),
                )
                .await;

            if outcome.clean() {
                self.cache.put(&key, self.dedup_ttl).await;
                stats.notified += 1;
            } else {
                stats.failed += 1;
            }
        }

        Ok(stats)
    }

    /// Fixed-interval flavor: wake every `interval`, sweep, repeat until
    /// the shutdown signal flips.
    pub async fn run(self, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "CompletionSweeper started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("CompletionSweeper received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(interval) => {
                    match self.run_once().await {
                        Ok(stats) if stats.scanned > 0 => {
                            debug!(
                                scanned = stats.scanned,
                                notified = stats.notified,
                                suppressed = stats.suppressed,
                                failed = stats.failed,
                                "sweep pass finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "sweep pass failed");
                        }
                    }
                }
            }
        }

        info!("CompletionSweeper shutdown complete");
    }
}

fn completed_message(order: &CompletedOrder) -> PushMessage {
    PushMessage {
        kind: "order".into(),
        title: "Repair order completed".into(),
        body: "Your vehicle is ready for pickup.".into(),
        entity_key: ENTITY_KIND.into(),
        entity_id: order.id.to_string(),
        screen: "OrderDetail".into(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::events::realtime_channel;
    use crate::notify::InMemoryDedupCache;
    use crate::notify::notifier::test_support::RecordingPushSender;
    use crate::stores::memory::{MemOrderRow, MemRepairOrderStore};
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    struct Harness {
        orders: MemRepairOrderStore,
        push: RecordingPushSender,
        sweeper: CompletionSweeper<MemRepairOrderStore, RecordingPushSender, InMemoryDedupCache>,
    }

    fn harness() -> Harness {
        let (tx, _rx) = realtime_channel();
        let orders = MemRepairOrderStore::new();
        let push = RecordingPushSender::new();
        let sweeper = CompletionSweeper::new(
            orders.clone(),
            Notifier::new(push.clone(), tx),
            InMemoryDedupCache::new(),
            TTL,
        );
        Harness {
            orders,
            push,
            sweeper,
        }
    }

    #[tokio::test]
    async fn notifies_each_completed_order_once_per_window() {
        let h = harness();
        h.orders
            .insert(MemOrderRow::completed(
                Uuid::from_u128(1),
                Uuid::from_u128(10),
                Some("tok-1".into()),
            ))
            .await;
        h.orders
            .insert(MemOrderRow::completed(
                Uuid::from_u128(2),
                Uuid::from_u128(11),
                Some("tok-2".into()),
            ))
            .await;

        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.scanned, 2);
        assert_eq!(stats.notified, 2);
        assert_eq!(h.push.count(), 2);

        // Second pass inside the TTL window: everything suppressed.
        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.suppressed, 2);
        assert_eq!(stats.notified, 0);
        assert_eq!(h.push.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn re_notifies_after_the_ttl_expires() {
        let h = harness();
        h.orders
            .insert(MemOrderRow::completed(
                Uuid::from_u128(1),
                Uuid::from_u128(10),
                Some("tok".into()),
            ))
            .await;

        h.sweeper.run_once().await.unwrap();
        assert_eq!(h.push.count(), 1);

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.suppressed, 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.notified, 1);
        assert_eq!(h.push.count(), 2);
    }

    #[tokio::test]
    async fn failed_send_is_retried_on_the_next_pass() {
        let h = harness();
        h.orders
            .insert(MemOrderRow::completed(
                Uuid::from_u128(1),
                Uuid::from_u128(10),
                Some("tok".into()),
            ))
            .await;

        h.push.fail.store(true, Ordering::SeqCst);
        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.notified, 0);

        // Gateway recovers: the next pass delivers and marks.
        h.push.fail.store(false, Ordering::SeqCst);
        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.notified, 1);

        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.suppressed, 1);
    }

    #[tokio::test]
    async fn tokenless_owner_is_marked_without_a_push() {
        let (tx, mut rx) = realtime_channel();
        let orders = MemRepairOrderStore::new();
        let push = RecordingPushSender::new();
        let sweeper = CompletionSweeper::new(
            orders.clone(),
            Notifier::new(push.clone(), tx),
            InMemoryDedupCache::new(),
            TTL,
        );

        let owner = Uuid::from_u128(10);
        let order_id = Uuid::from_u128(1);
        orders
            .insert(MemOrderRow::completed(order_id, owner, None))
            .await;

        let stats = sweeper.run_once().await.unwrap();
        assert_eq!(stats.notified, 1);
        assert_eq!(push.count(), 0);

        // The realtime channel still carried the event.
        let update = rx.recv().await.unwrap();
        assert_eq!(update.event, RealtimeEvent::OrderCompleted { order_id });
        assert!(update.scope.includes(owner));

        // And the marker suppresses the next pass.
        let stats = sweeper.run_once().await.unwrap();
        assert_eq!(stats.suppressed, 1);
    }

    #[tokio::test]
    async fn archived_and_open_orders_are_not_swept() {
        let h = harness();
        let mut archived = MemOrderRow::completed(
            Uuid::from_u128(1),
            Uuid::from_u128(10),
            Some("tok".into()),
        );
        archived.is_archived = true;
        h.orders.insert(archived).await;
        h.orders
            .insert(MemOrderRow::open(
                Uuid::from_u128(2),
                Uuid::from_u128(11),
                Some("tok".into()),
            ))
            .await;

        let stats = h.sweeper.run_once().await.unwrap();
        assert_eq!(stats.scanned, 0);
        assert_eq!(h.push.count(), 0);
    }

    #[tokio::test]
    async fn interval_loop_stops_on_shutdown() {
        let h = harness();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(h.sweeper.run(Duration::from_millis(10), shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop after shutdown signal")
            .unwrap();
    }
}
