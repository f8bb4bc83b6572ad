//! DailySweeper.
//!
//! Wall-clock flavor of the sweep trigger: once per day at a fixed local
//! hour. The next wake-up is recomputed from the clock on every iteration,
//! so host clock adjustments self-correct, and a minimum sleep floor keeps
//! a non-positive delay from spinning the loop.

use crate::notify::{DedupCache, PushSender};
use crate::processors::completion_sweeper::CompletionSweeper;
use crate::stores::RepairOrderStore;
use crate::utils::next_run::{MIN_SLEEP, next_daily_run};
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// DailySweeper delegates to [`CompletionSweeper::run_once`] once per day.
pub struct DailySweeper<O, P, C> {
    sweeper: CompletionSweeper<O, P, C>,
    hour: u8,
    offset: UtcOffset,
}

impl<O, P, C> DailySweeper<O, P, C>
where
    O: RepairOrderStore,
    P: PushSender,
    C: DedupCache,
{
    pub fn new(sweeper: CompletionSweeper<O, P, C>, hour: u8, offset: UtcOffset) -> Self {
        Self {
            sweeper,
            hour,
            offset,
        }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(hour = self.hour, offset = %self.offset, "DailySweeper started");

        loop {
            let now = OffsetDateTime::now_utc().to_offset(self.offset);
            let next = next_daily_run(now, self.hour);
            let sleep_for = std::time::Duration::try_from(next - now)
                .unwrap_or(MIN_SLEEP)
                .max(MIN_SLEEP);

            debug!(%next, sleep_secs = sleep_for.as_secs(), "sleeping until next daily sweep");

            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("DailySweeper received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(sleep_for) => {
                    match self.sweeper.run_once().await {
                        Ok(stats) => {
                            info!(
                                scanned = stats.scanned,
                                notified = stats.notified,
                                suppressed = stats.suppressed,
                                failed = stats.failed,
                                "daily sweep finished"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "daily sweep failed");
                        }
                    }
                }
            }
        }

        info!("DailySweeper shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::events::realtime_channel;
    use crate::notify::notifier::test_support::RecordingPushSender;
    use crate::notify::{InMemoryDedupCache, Notifier};
    use crate::stores::memory::MemRepairOrderStore;
    use std::time::Duration;

    #[tokio::test]
    async fn stops_on_shutdown_while_sleeping() {
        let (tx, _rx) = realtime_channel();
        let sweeper = CompletionSweeper::new(
            MemRepairOrderStore::new(),
            Notifier::new(RecordingPushSender::new(), tx),
            InMemoryDedupCache::new(),
            Duration::from_secs(60),
        );
        let daily = DailySweeper::new(sweeper, 8, UtcOffset::UTC);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(daily.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("daily sweeper did not stop after shutdown signal")
            .unwrap();
    }
}
