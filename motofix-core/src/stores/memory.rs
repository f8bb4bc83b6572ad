//! In-process implementations of the storage contracts.
//!
//! These back the unit tests for the processors. They keep the same
//! claiming and attempt-accounting semantics as the Postgres versions,
//! guarded by a single `RwLock` instead of row locks.

use super::{InboxStore, PaymentLedger, RepairOrderStore, StoreError};
use crate::entities::inbox_records::{InboxOutcome, InboxRecord, InboxStatus};
use crate::entities::payment_records::{PaymentRecord, PaymentStatus};
use crate::entities::repair_orders::{CompletedOrder, OwnerContact};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

fn now_utc() -> PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemInboxInner {
    next_id: i64,
    records: Vec<InboxRecord>,
}

#[derive(Clone, Default)]
pub struct MemInboxStore {
    inner: Arc<RwLock<MemInboxInner>>,
}

impl MemInboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot one record by id.
    pub async fn get(&self, id: i64) -> Option<InboxRecord> {
        let inner = self.inner.read().await;
        inner.records.iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot every record, in insertion order.
    pub async fn all(&self) -> Vec<InboxRecord> {
        self.inner.read().await.records.clone()
    }
}

#[async_trait]
impl InboxStore for MemInboxStore {
    async fn enqueue(&self, raw_payload: String) -> Result<InboxRecord, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let record = InboxRecord {
            id: inner.next_id,
            raw_payload,
            received_at: now_utc(),
            status: InboxStatus::Pending,
            attempts: 0,
            last_error: None,
            processed_at: None,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn claim_batch(
        &self,
        limit: u32,
        max_attempts: i32,
    ) -> Result<Vec<InboxRecord>, StoreError> {
        let mut inner = self.inner.write().await;

        let mut eligible: Vec<usize> = inner
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_claimable(max_attempts))
            .map(|(i, _)| i)
            .collect();
        eligible.sort_by_key(|&i| (inner.records[i].received_at, inner.records[i].id));
        eligible.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(eligible.len());
        for i in eligible {
            inner.records[i].status = InboxStatus::Claimed;
            claimed.push(inner.records[i].clone());
        }
        Ok(claimed)
    }

    async fn mark_outcome(&self, id: i64, outcome: InboxOutcome) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.records.iter_mut().find(|r| r.id == id) else {
            return Ok(());
        };
        match outcome {
            InboxOutcome::Processed => {
                record.status = InboxStatus::Processed;
                record.processed_at = Some(now_utc());
                record.last_error = None;
            }
            InboxOutcome::Failed { error } => {
                record.status = InboxStatus::Failed;
                record.attempts += 1;
                record.last_error = Some(error);
            }
            InboxOutcome::Dead { error } => {
                record.status = InboxStatus::Dead;
                record.attempts += 1;
                record.last_error = Some(error);
            }
        }
        Ok(())
    }

    async fn count_dead(&self) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.status == InboxStatus::Dead)
            .count() as u64)
    }
}

// ---------------------------------------------------------------------------
// Repair orders
// ---------------------------------------------------------------------------

/// One row of the in-memory repair-order projection.
#[derive(Debug, Clone)]
pub struct MemOrderRow {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub device_token: Option<String>,
    pub completed: bool,
    pub is_archived: bool,
    pub is_cancelled: bool,
    pub completed_at: Option<PrimitiveDateTime>,
    pub paid_status: PaymentStatus,
}

impl MemOrderRow {
    pub fn completed(id: Uuid, owner_user_id: Uuid, device_token: Option<String>) -> Self {
        Self {
            id,
            owner_user_id,
            device_token,
            completed: true,
            is_archived: false,
            is_cancelled: false,
            completed_at: Some(now_utc()),
            paid_status: PaymentStatus::Created,
        }
    }

    pub fn open(id: Uuid, owner_user_id: Uuid, device_token: Option<String>) -> Self {
        Self {
            completed: false,
            completed_at: None,
            ..Self::completed(id, owner_user_id, device_token)
        }
    }
}

#[derive(Clone, Default)]
pub struct MemRepairOrderStore {
    inner: Arc<RwLock<HashMap<Uuid, MemOrderRow>>>,
}

impl MemRepairOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, row: MemOrderRow) {
        self.inner.write().await.insert(row.id, row);
    }

    pub async fn paid_status(&self, order_id: Uuid) -> Option<PaymentStatus> {
        self.inner.read().await.get(&order_id).map(|r| r.paid_status)
    }

    pub(crate) async fn set_paid_status(&self, order_id: Uuid, status: PaymentStatus) {
        if let Some(row) = self.inner.write().await.get_mut(&order_id) {
            row.paid_status = status;
        }
    }
}

#[async_trait]
impl RepairOrderStore for MemRepairOrderStore {
    async fn owner_contact(&self, order_id: Uuid) -> Result<Option<OwnerContact>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.get(&order_id).map(|r| OwnerContact {
            owner_user_id: r.owner_user_id,
            device_token: r.device_token.clone(),
        }))
    }

    async fn completed_unarchived(&self) -> Result<Vec<CompletedOrder>, StoreError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<CompletedOrder> = inner
            .values()
            .filter(|r| r.completed && !r.is_archived && !r.is_cancelled)
            .map(|r| CompletedOrder {
                id: r.id,
                owner_user_id: r.owner_user_id,
                device_token: r.device_token.clone(),
                completed_at: r.completed_at,
            })
            .collect();
        orders.sort_by_key(|o| (o.completed_at, o.id));
        Ok(orders)
    }
}

// ---------------------------------------------------------------------------
// Payment ledger
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemPaymentLedger {
    payments: Arc<RwLock<HashMap<i64, PaymentRecord>>>,
    orders: MemRepairOrderStore,
}

impl MemPaymentLedger {
    /// The ledger needs the order store so that `apply_paid` can propagate
    /// the paid status, mirroring the single-transaction Postgres update.
    pub fn new(orders: MemRepairOrderStore) -> Self {
        Self {
            payments: Arc::default(),
            orders,
        }
    }

    pub async fn insert(&self, record: PaymentRecord) {
        self.payments.write().await.insert(record.order_code, record);
    }

    pub async fn get(&self, order_code: i64) -> Option<PaymentRecord> {
        self.payments.read().await.get(&order_code).cloned()
    }
}

#[async_trait]
impl PaymentLedger for MemPaymentLedger {
    async fn get_by_order_code(
        &self,
        order_code: i64,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.payments.read().await.get(&order_code).cloned())
    }

    async fn apply_paid(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
        payment_date: PrimitiveDateTime,
    ) -> Result<(), StoreError> {
        let repair_order_id = {
            let mut payments = self.payments.write().await;
            let Some(record) = payments.get_mut(&order_code) else {
                return Ok(());
            };
            record.status = PaymentStatus::Paid;
            record.provider_code = Some(provider_code.to_string());
            record.provider_desc = provider_desc.map(str::to_string);
            record.payment_date = Some(payment_date);
            record.updated_at = now_utc();
            record.repair_order_id
        };
        self.orders
            .set_paid_status(repair_order_id, PaymentStatus::Paid)
            .await;
        Ok(())
    }

    async fn apply_cancelled(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        if let Some(record) = payments.get_mut(&order_code) {
            record.status = PaymentStatus::Cancelled;
            record.provider_code = Some(provider_code.to_string());
            record.provider_desc = provider_desc.map(str::to_string);
            record.updated_at = now_utc();
        }
        Ok(())
    }
}
