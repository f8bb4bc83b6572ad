//! LedgerReconciler processor.
//!
//! Applies one parsed provider event to the payment ledger and its linked
//! repair order. The terminal-state check is the idempotency guard: once an
//! entry is `Paid` or `Cancelled` no further transition is applied, so
//! replays of the same callback converge to the same state. The owner
//! notification fired on the transition to `Paid` is *not* covered by the
//! guard; a replay that races the terminal-state read may notify twice.

use crate::entities::payment_records::PaymentRecord;
use crate::entities::provider_events::ProviderEvent;
use crate::events::{RealtimeEvent, RealtimeScope};
use crate::notify::{Notifier, PushMessage, PushSender};
use crate::stores::{PaymentLedger, RepairOrderStore, StoreError};
use kanau::processor::Processor;
use thiserror::Error;
use time::PrimitiveDateTime;
use tracing::{debug, info, warn};

/// Errors that can occur while reconciling an event.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No ledger entry carries this correlation id. Permanent: replaying
    /// the event cannot make the entry appear.
    #[error("no ledger entry for order code {0}")]
    NotFound(i64),

    /// Storage error, retryable on the next claim.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ReconcileError::NotFound(_))
    }
}

/// How the event landed on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Paid,
    Cancelled,
    /// The entry was already terminal; the event was a safe no-op.
    AlreadyTerminal,
}

/// LedgerReconciler applies provider events to the payment ledger.
pub struct LedgerReconciler<L, O, P> {
    ledger: L,
    orders: O,
    notifier: Notifier<P>,
}

impl<L, O, P> LedgerReconciler<L, O, P>
where
    L: PaymentLedger,
    O: RepairOrderStore,
    P: PushSender,
{
    pub fn new(ledger: L, orders: O, notifier: Notifier<P>) -> Self {
        Self {
            ledger,
            orders,
            notifier,
        }
    }

    async fn apply_paid(
        &self,
        record: &PaymentRecord,
        event: &ProviderEvent,
    ) -> Result<(), ReconcileError> {
        let payment_date = event.transaction_time.unwrap_or_else(now_utc);

        if record.amount != event.amount {
            warn!(
                order_code = event.order_code,
                ledger_amount = %record.amount,
                event_amount = %event.amount,
                "provider amount differs from ledger amount"
            );
        }

        self.ledger
            .apply_paid(
                event.order_code,
                &event.provider_code,
                event.provider_desc.as_deref(),
                payment_date,
            )
            .await?;

        info!(
            order_code = event.order_code,
            repair_order_id = %record.repair_order_id,
            "payment confirmed, ledger entry paid"
        );

        self.notify_owner_paid(record).await;
        Ok(())
    }

    /// Best effort: a missing owner contact is logged, never an error. The
    /// ledger transition has already committed at this point.
    async fn notify_owner_paid(&self, record: &PaymentRecord) {
        let contact = match self.orders.owner_contact(record.repair_order_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(
                    repair_order_id = %record.repair_order_id,
                    "no owner contact for paid order, skipping notification"
                );
                return;
            }
            Err(e) => {
                warn!(
                    repair_order_id = %record.repair_order_id,
                    error = %e,
                    "failed to look up owner contact, skipping notification"
                );
                return;
            }
        };

        self.notifier
            .notify(
                RealtimeScope::User(contact.owner_user_id),
                contact.device_token.as_deref(),
                RealtimeEvent::OrderPaid {
                    order_id: record.repair_order_id,
                },
                paid_message(record),
            )
            .await;
    }
}

fn paid_message(record: &PaymentRecord) -> PushMessage {
    PushMessage {
        kind: "payment".into(),
        title: "Payment received".into(),
        body: "Your repair order has been paid.".into(),
        entity_key: "repair-order".into(),
        entity_id: record.repair_order_id.to_string(),
        screen: "OrderDetail".into(),
    }
}

fn now_utc() -> PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

impl<L, O, P> Processor<ProviderEvent> for LedgerReconciler<L, O, P>
where
    L: PaymentLedger,
    O: RepairOrderStore,
    P: PushSender,
{
    type Output = ReconcileOutcome;
    type Error = ReconcileError;

    async fn process(&self, event: ProviderEvent) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(record) = self.ledger.get_by_order_code(event.order_code).await? else {
            return Err(ReconcileError::NotFound(event.order_code));
        };

        if record.is_terminal() {
            debug!(
                order_code = event.order_code,
                status = ?record.status,
                "ledger entry already terminal, ignoring replay"
            );
            return Ok(ReconcileOutcome::AlreadyTerminal);
        }

        if event.is_success() {
            self.apply_paid(&record, &event).await?;
            Ok(ReconcileOutcome::Paid)
        } else {
            self.ledger
                .apply_cancelled(
                    event.order_code,
                    &event.provider_code,
                    event.provider_desc.as_deref(),
                )
                .await?;
            info!(
                order_code = event.order_code,
                provider_code = %event.provider_code,
                "payment not successful, ledger entry cancelled"
            );
            Ok(ReconcileOutcome::Cancelled)
        }
    }
}
