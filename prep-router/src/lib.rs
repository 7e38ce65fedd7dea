//! # prep-router
//!
//! Kitchen ticket routing core for restaurant order line-items.
//!
//! This crate decides which physical kitchen printers serve a given
//! order item, detects which items have not yet been sent, fans the
//! items out to the deduplicated set of destination printers with
//! per-printer fault isolation, and renders printer-native ESC/POS
//! tickets (via `prep-printer`).
//!
//! ## Components
//!
//! - [`assignments`] - assignment rule persistence, in-memory cache,
//!   and exclusive-tier resolution (menu-item rules override category
//!   rules, never merge)
//! - [`dispatch`] - pending-item detection and the per-printer
//!   dispatcher with timeouts, single-flight guard and metrics
//! - [`ticket`] - deterministic kitchen ticket rendering
//! - [`reconcile`] - periodic drift self-heal between persisted and
//!   in-memory assignment state
//!
//! All external collaborators (printer registry, category/menu-item
//! catalog, operation log, printer transport) are injected as trait
//! objects; nothing in this crate is a process-wide singleton.

pub mod assignments;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod oplog;
pub mod reconcile;
pub mod registry;
pub mod ticket;
pub mod transport;
pub mod types;

pub use assignments::{AssignmentService, AssignmentStorage};
pub use catalog::{MemoryTargetCatalog, TargetCatalog};
pub use config::RouterConfig;
pub use dispatch::{DispatchMetrics, KitchenDispatcher, pending_items};
pub use error::{RouterError, RouterResult};
pub use oplog::{OperationLogger, TracingOperationLogger};
pub use reconcile::SyncReconciler;
pub use registry::{MemoryPrinterRegistry, PrinterInfo, PrinterRegistry};
pub use ticket::TicketRenderer;
pub use transport::{DestinationKind, PrinterTransport, TcpTransport};
pub use types::*;
