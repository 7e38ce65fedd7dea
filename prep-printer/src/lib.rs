//! # prep-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building (deterministic byte output)
//! - Network printing (TCP port 9100) with connect timeout
//!
//! Business logic (WHAT to print) stays in application code: ticket
//! rendering and routing live in `prep-router`.
//!
//! Text is passed through as raw bytes. Code-page selection and
//! multi-language conversion are deliberately out of scope.
//!
//! ## Example
//!
//! ```ignore
//! use prep_printer::{TicketBuilder, NetworkPrinter, Printer};
//!
//! let mut builder = TicketBuilder::new(48);
//! builder.center();
//! builder.double_size();
//! builder.line("DINE IN ORDER");
//! builder.reset_size();
//! builder.sep_double();
//! builder.left();
//! builder.line("Table: 12");
//! builder.cut();
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&builder.build()).await?;
//! ```

mod error;
mod escpos;
mod printer;

// Re-exports
pub use error::{PrintError, PrintResult};
pub use escpos::{TicketBuilder, text_width};
pub use printer::{NetworkPrinter, Printer};
