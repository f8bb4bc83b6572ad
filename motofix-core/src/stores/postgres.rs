//! Postgres implementations of the storage contracts.

use super::{InboxStore, PaymentLedger, RepairOrderStore, StoreError};
use crate::entities::payment_records::{PaymentRecord, PaymentStatus};
use crate::entities::{CompletedOrder, InboxOutcome, InboxRecord, OwnerContact};
use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

const INBOX_COLUMNS: &str = "id, raw_payload, received_at, status, attempts, last_error, processed_at";

#[derive(Clone)]
pub struct PgInboxStore {
    pool: PgPool,
}

impl PgInboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboxStore for PgInboxStore {
    async fn enqueue(&self, raw_payload: String) -> Result<InboxRecord, StoreError> {
        let record = sqlx::query_as::<_, InboxRecord>(&format!(
            "INSERT INTO inbox_records (raw_payload) VALUES ($1) RETURNING {INBOX_COLUMNS}"
        ))
        .bind(raw_payload)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn claim_batch(
        &self,
        limit: u32,
        max_attempts: i32,
    ) -> Result<Vec<InboxRecord>, StoreError> {
        // Claim and ownership in one statement; SKIP LOCKED keeps a second
        // instance from claiming the same rows.
        let mut records = sqlx::query_as::<_, InboxRecord>(
            r#"
            UPDATE inbox_records AS r
            SET status = 'claimed'
            FROM (
                SELECT id FROM inbox_records
                WHERE status IN ('pending', 'failed') AND attempts < $1
                ORDER BY received_at ASC, id ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            ) AS eligible
            WHERE r.id = eligible.id
            RETURNING r.id, r.raw_payload, r.received_at, r.status,
                      r.attempts, r.last_error, r.processed_at
            "#,
        )
        .bind(max_attempts)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        // RETURNING does not honor the subquery order.
        records.sort_by_key(|r| (r.received_at, r.id));
        Ok(records)
    }

    async fn mark_outcome(&self, id: i64, outcome: InboxOutcome) -> Result<(), StoreError> {
        match outcome {
            InboxOutcome::Processed => {
                sqlx::query(
                    "UPDATE inbox_records
                     SET status = 'processed', processed_at = now(), last_error = NULL
                     WHERE id = $1",
                )
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            InboxOutcome::Failed { error } => {
                sqlx::query(
                    "UPDATE inbox_records
                     SET status = 'failed', attempts = attempts + 1, last_error = $2
                     WHERE id = $1",
                )
                .bind(id)
                .bind(error)
                .execute(&self.pool)
                .await?;
            }
            InboxOutcome::Dead { error } => {
                sqlx::query(
                    "UPDATE inbox_records
                     SET status = 'dead', attempts = attempts + 1, last_error = $2
                     WHERE id = $1",
                )
                .bind(id)
                .bind(error)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn count_dead(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM inbox_records WHERE status = 'dead'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[derive(Clone)]
pub struct PgPaymentLedger {
    pool: PgPool,
}

impl PgPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedger for PgPaymentLedger {
    async fn get_by_order_code(
        &self,
        order_code: i64,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let record = sqlx::query_as::<_, PaymentRecord>(
            "SELECT order_code, status, repair_order_id, amount,
                    provider_code, provider_desc, payment_date, updated_at
             FROM payment_records WHERE order_code = $1",
        )
        .bind(order_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn apply_paid(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
        payment_date: PrimitiveDateTime,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let repair_order_id: Uuid = sqlx::query_scalar(
            "UPDATE payment_records
             SET status = 'paid', provider_code = $2, provider_desc = $3,
                 payment_date = $4, updated_at = now()
             WHERE order_code = $1
             RETURNING repair_order_id",
        )
        .bind(order_code)
        .bind(provider_code)
        .bind(provider_desc)
        .bind(payment_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE repair_orders SET paid_status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(repair_order_id)
        .bind(PaymentStatus::Paid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn apply_cancelled(
        &self,
        order_code: i64,
        provider_code: &str,
        provider_desc: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE payment_records
             SET status = 'cancelled', provider_code = $2, provider_desc = $3,
                 updated_at = now()
             WHERE order_code = $1",
        )
        .bind(order_code)
        .bind(provider_code)
        .bind(provider_desc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRepairOrderStore {
    pool: PgPool,
}

impl PgRepairOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepairOrderStore for PgRepairOrderStore {
    async fn owner_contact(&self, order_id: Uuid) -> Result<Option<OwnerContact>, StoreError> {
        let contact = sqlx::query_as::<_, OwnerContact>(
            "SELECT o.owner_user_id, u.device_token
             FROM repair_orders o
             JOIN users u ON u.id = o.owner_user_id
             WHERE o.id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn completed_unarchived(&self) -> Result<Vec<CompletedOrder>, StoreError> {
        let orders = sqlx::query_as::<_, CompletedOrder>(
            "SELECT o.id, o.owner_user_id, u.device_token, o.completed_at
             FROM repair_orders o
             JOIN users u ON u.id = o.owner_user_id
             WHERE o.status = 'completed'
               AND NOT o.is_archived
               AND NOT o.is_cancelled
             ORDER BY o.completed_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}
