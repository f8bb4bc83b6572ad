//! Background processors.
//!
//! - `LedgerReconciler`: applies one parsed provider event to the payment
//!   ledger, exactly once per terminal state
//! - `InboxProcessor`: drains the inbox under a concurrency bound
//! - `CompletionSweeper`: periodic scan for completed orders, driving the
//!   notifier through the dedup cache
//! - `DailySweeper`: wall-clock daily trigger for the same sweep

pub mod completion_sweeper;
pub mod daily_sweeper;
pub mod inbox_processor;
pub mod ledger_reconciler;

pub use completion_sweeper::{CompletionSweeper, SweepStats};
pub use daily_sweeper::DailySweeper;
pub use inbox_processor::{InboxProcessor, InboxProcessorConfig};
pub use ledger_reconciler::{LedgerReconciler, ReconcileError, ReconcileOutcome};
