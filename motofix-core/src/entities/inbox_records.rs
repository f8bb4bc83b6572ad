//! Inbox records: the durable staging table for raw provider callbacks.
//!
//! Rows are appended by the ingestion endpoint and drained by the
//! `InboxProcessor`. They are never deleted; terminal rows stay behind as
//! an audit trail.

/// One received provider callback, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InboxRecord {
    pub id: i64,
    pub raw_payload: String,
    pub received_at: time::PrimitiveDateTime,
    pub status: InboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub processed_at: Option<time::PrimitiveDateTime>,
}

impl InboxRecord {
    /// A record can be claimed again iff it is `Pending` or `Failed` and has
    /// attempts left.
    pub fn is_claimable(&self, max_attempts: i32) -> bool {
        matches!(self.status, InboxStatus::Pending | InboxStatus::Failed)
            && self.attempts < max_attempts
    }
}

/// Lifecycle of an inbox record.
///
/// `Pending -> Claimed -> Processed | Failed | Dead`; `Failed` rows loop back
/// through `Claimed` until their attempt budget is spent, at which point they
/// become `Dead` and are never claimed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "inbox_status")]
pub enum InboxStatus {
    Pending,
    Claimed,
    Processed,
    Failed,
    Dead,
}

/// Outcome of one processing unit, persisted right after the unit finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxOutcome {
    /// The event was applied (or was a safe no-op replay).
    Processed,
    /// A retryable error; the record goes back into the claimable set and
    /// consumes one attempt.
    Failed { error: String },
    /// A permanent error, or the attempt budget is exhausted. The record is
    /// dead-lettered and never claimed again.
    Dead { error: String },
}
