//! Kitchen ticket rendering

pub mod renderer;

pub use renderer::{TicketError, TicketRenderer};
