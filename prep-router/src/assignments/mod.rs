//! Printer assignment rules
//!
//! An assignment maps a category or menu item to a destination
//! printer. Rules are persisted in redb and mirrored in an in-memory
//! cache that carries the two lookup indices resolution reads from.
//! Menu-item rules fully override category rules (exclusive tiers,
//! never merged).

pub mod cache;
pub mod service;
pub mod storage;

pub use cache::AssignmentCache;
pub use service::AssignmentService;
pub use storage::{AssignmentStorage, StorageError, StorageResult};
