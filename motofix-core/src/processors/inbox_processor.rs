//! InboxProcessor.
//!
//! The polling loop that drains the inbox: claim a batch oldest-first, fan
//! the records out under a counting semaphore, persist each unit's outcome
//! as soon as that unit finishes, then wait for the whole batch before
//! claiming the next one. Records in the same batch race; the reconciler's
//! terminal-state check is what makes that safe, not ordering.

use crate::entities::inbox_records::{InboxOutcome, InboxRecord};
use crate::entities::provider_events::{ProviderEvent, ProviderEventParseError};
use crate::notify::PushSender;
use crate::processors::ledger_reconciler::{LedgerReconciler, ReconcileError, ReconcileOutcome};
use crate::stores::{InboxStore, PaymentLedger, RepairOrderStore, StoreError};
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Knobs for the polling loop. `batch_size` is the one batch-size setting;
/// the claim query uses it directly.
#[derive(Debug, Clone)]
pub struct InboxProcessorConfig {
    pub batch_size: u32,
    pub max_attempts: i32,
    pub max_concurrency: usize,
    pub poll_interval: Duration,
    /// Pause after an error in the polling logic itself, so a failing
    /// claim query cannot spin the loop.
    pub error_pause: Duration,
}

impl Default for InboxProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 10,
            max_concurrency: 8,
            poll_interval: Duration::from_millis(800),
            error_pause: Duration::from_secs(5),
        }
    }
}

/// Everything that can fail inside one processing unit.
#[derive(Debug, Error)]
enum UnitError {
    #[error(transparent)]
    Parse(#[from] ProviderEventParseError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl UnitError {
    /// Permanent errors dead-letter the record immediately instead of
    /// burning through the attempt budget.
    fn is_permanent(&self) -> bool {
        matches!(self, UnitError::Reconcile(e) if e.is_permanent())
    }
}

/// InboxProcessor drains the inbox store continuously.
pub struct InboxProcessor<S, L, O, P> {
    inbox: S,
    reconciler: Arc<LedgerReconciler<L, O, P>>,
    config: InboxProcessorConfig,
}

impl<S, L, O, P> InboxProcessor<S, L, O, P>
where
    S: InboxStore + Clone + Send + Sync + 'static,
    L: PaymentLedger + Send + Sync + 'static,
    O: RepairOrderStore + Send + Sync + 'static,
    P: PushSender + Send + Sync + 'static,
{
    pub fn new(
        inbox: S,
        reconciler: Arc<LedgerReconciler<L, O, P>>,
        config: InboxProcessorConfig,
    ) -> Self {
        Self {
            inbox,
            reconciler,
            config,
        }
    }

    /// Run until the shutdown signal flips. In-flight units always finish;
    /// the signal is only observed between batches.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            max_concurrency = self.config.max_concurrency,
            "InboxProcessor started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));

        loop {
            if *shutdown_rx.borrow() {
                info!("InboxProcessor received shutdown signal");
                break;
            }

            match self.process_next_batch(&semaphore).await {
                Ok(0) => {
                    tokio::select! {
                        biased;

                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                info!("InboxProcessor received shutdown signal");
                                break;
                            }
                        }

                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(count) => {
                    debug!(count, "drained inbox batch");
                }
                Err(e) => {
                    error!(error = %e, "inbox batch failed, pausing before retry");
                    tokio::select! {
                        biased;

                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }

                        _ = tokio::time::sleep(self.config.error_pause) => {}
                    }
                }
            }
        }

        info!("InboxProcessor shutdown complete");
    }

    /// Claim one batch and process it to completion. Returns the number of
    /// records claimed.
    pub async fn process_next_batch(&self, semaphore: &Arc<Semaphore>) -> Result<usize, StoreError> {
        let batch = self
            .inbox
            .claim_batch(self.config.batch_size, self.config.max_attempts)
            .await?;
        if batch.is_empty() {
            return Ok(0);
        }
        let count = batch.len();

        let mut units = JoinSet::new();
        for record in batch {
            let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
                break;
            };
            let inbox = self.inbox.clone();
            let reconciler = Arc::clone(&self.reconciler);
            let max_attempts = self.config.max_attempts;
            units.spawn(async move {
                Self::process_record(&inbox, &reconciler, record, max_attempts).await;
                drop(permit);
            });
        }

        // The whole batch finishes before the next claim, keeping at most
        // one batch in flight.
        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "processing unit panicked");
            }
        }

        Ok(count)
    }

    /// One processing unit: parse, reconcile, persist the outcome. Nothing
    /// escapes; every error lands on the record.
    async fn process_record(
        inbox: &S,
        reconciler: &LedgerReconciler<L, O, P>,
        record: InboxRecord,
        max_attempts: i32,
    ) {
        let outcome = match Self::apply(reconciler, &record).await {
            Ok(applied) => {
                debug!(inbox_id = record.id, outcome = ?applied, "inbox record processed");
                InboxOutcome::Processed
            }
            Err(e) => {
                let error = e.to_string();
                if e.is_permanent() {
                    warn!(inbox_id = record.id, error = %error, "permanent failure, dead-lettering");
                    InboxOutcome::Dead { error }
                } else if record.attempts + 1 >= max_attempts {
                    warn!(
                        inbox_id = record.id,
                        attempts = record.attempts + 1,
                        error = %error,
                        "attempt budget exhausted, dead-lettering"
                    );
                    InboxOutcome::Dead { error }
                } else {
                    warn!(inbox_id = record.id, error = %error, "inbox record failed, will retry");
                    InboxOutcome::Failed { error }
                }
            }
        };

        if let Err(e) = inbox.mark_outcome(record.id, outcome).await {
            error!(inbox_id = record.id, error = %e, "failed to persist inbox outcome");
        }
    }

    async fn apply(
        reconciler: &LedgerReconciler<L, O, P>,
        record: &InboxRecord,
    ) -> Result<ReconcileOutcome, UnitError> {
        let event = ProviderEvent::parse(&record.raw_payload)?;
        Ok(reconciler.process(event).await?)
    }
}
