pub mod inbox_records;
pub mod payment_records;
pub mod provider_events;
pub mod repair_orders;

pub use inbox_records::{InboxOutcome, InboxRecord, InboxStatus};
pub use payment_records::{PaymentRecord, PaymentStatus};
pub use provider_events::{ProviderEvent, ProviderEventParseError};
pub use repair_orders::{CompletedOrder, OwnerContact};
