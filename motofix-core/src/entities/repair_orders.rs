//! Read projections of the repair-order aggregate.
//!
//! The aggregate itself (quotations, inspections, vehicles) lives outside
//! this crate; the processors only see these two narrow views.

use uuid::Uuid;

/// A repair order that satisfies the notify-worthy predicate: completed,
/// not archived, not cancelled.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CompletedOrder {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub device_token: Option<String>,
    pub completed_at: Option<time::PrimitiveDateTime>,
}

/// Where to reach the owner of a repair order.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OwnerContact {
    pub owner_user_id: Uuid,
    pub device_token: Option<String>,
}
