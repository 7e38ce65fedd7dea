//! Routing error taxonomy
//!
//! Printer and network failures are contained inside the dispatch loop
//! and never escalate to "order not saved"; only assignment mutations
//! surface errors to their immediate caller.

use thiserror::Error;

use crate::assignments::StorageError;

#[derive(Debug, Error)]
pub enum RouterError {
    /// The referenced printer does not exist in the printer registry.
    /// Not auto-remediated: the assignment is rejected outright.
    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    /// An identical active (printer, target, type) assignment exists
    #[error("Duplicate assignment: printer {printer_id} already assigned to {target_id}")]
    DuplicateAssignment {
        printer_id: String,
        target_id: String,
    },

    /// Storage transaction failed; in-memory state is unchanged
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

pub type RouterResult<T> = Result<T, RouterError>;
