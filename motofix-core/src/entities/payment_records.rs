//! Payment ledger entries, correlated to provider callbacks by `order_code`.

use rust_decimal::Decimal;
use uuid::Uuid;

/// One ledger entry. `order_code` is the provider's correlation id; the
/// entry links back to the repair order it pays for.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentRecord {
    pub order_code: i64,
    pub status: PaymentStatus,
    pub repair_order_id: Uuid,
    pub amount: Decimal,
    pub provider_code: Option<String>,
    pub provider_desc: Option<String>,
    pub payment_date: Option<time::PrimitiveDateTime>,
    pub updated_at: time::PrimitiveDateTime,
}

impl PaymentRecord {
    /// Terminal entries are never transitioned again; this is the
    /// idempotency anchor for callback replays.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PaymentStatus::Paid | PaymentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_status")]
pub enum PaymentStatus {
    Created,
    Paid,
    Cancelled,
}
