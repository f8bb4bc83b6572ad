//! Narrow storage contracts consumed by the processors.
//!
//! The processors never touch SQL directly; they speak to these traits.
//! `postgres` holds the production implementations, `memory` the in-process
//! ones used by unit tests.

pub mod memory;
pub mod postgres;

use crate::entities::{CompletedOrder, InboxOutcome, InboxRecord, OwnerContact};
use crate::entities::payment_records::PaymentRecord;
use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

pub use memory::{MemInboxStore, MemPaymentLedger, MemRepairOrderStore};
pub use postgres::{PgInboxStore, PgPaymentLedger, PgRepairOrderStore};

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable inbox of raw provider callbacks.
#[async_trait]
pub trait InboxStore: Send + Sync {
    /// Append a callback body verbatim. Called only by the ingestion
    /// endpoint.
    async fn enqueue(&self, raw_payload: String) -> Result<InboxRecord, StoreError>;

    /// Claim up to `limit` records, oldest first. Claiming atomically moves
    /// the rows to `Claimed` so that a second processor instance cannot pick
    /// them up; only `Pending`/`Failed` rows with `attempts < max_attempts`
    /// are eligible.
    async fn claim_batch(
        &self,
        limit: u32,
        max_attempts: i32,
    ) -> Result<Vec<InboxRecord>, StoreError>;

    /// Persist the outcome of one processing unit. `Failed` and `Dead`
    /// consume one attempt; `Processed` stamps `processed_at`.
    async fn mark_outcome(&self, id: i64, outcome: InboxOutcome) -> Result<(), StoreError>;

    /// Number of dead-lettered records, for operator visibility.
    async fn count_dead(&self) -> Result<u64, StoreError>;
}

/// The payment ledger and its linked repair order, updated as one unit.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn get_by_order_code(
        &self,
        order_code: i64,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Transition the entry to `Paid` and propagate the paid status to the
    /// linked repair order in the same transaction.
    async fn apply_paid(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
        payment_date: PrimitiveDateTime,
    ) -> Result<(), StoreError>;

    /// Transition the entry to `Cancelled`, recording the provider's
    /// code/desc for later inspection.
    async fn apply_cancelled(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Read-side of the repair-order aggregate.
#[async_trait]
pub trait RepairOrderStore: Send + Sync {
    /// Owner id and device token for a single order.
    async fn owner_contact(&self, order_id: Uuid) -> Result<Option<OwnerContact>, StoreError>;

    /// All orders matching the notify-worthy predicate: completed, not
    /// archived, not cancelled.
    async fn completed_unarchived(&self) -> Result<Vec<CompletedOrder>, StoreError>;
}
