//! Order item dispatch
//!
//! Splits an order into already-routed vs new items, fans the new
//! items out to the deduplicated set of destination printers, and
//! isolates each printer behind its own timeout.

pub mod detector;
pub mod dispatcher;
pub mod metrics;

pub use detector::pending_items;
pub use dispatcher::{KitchenDispatcher, SendOutcome};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
