//! Routing data model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What an assignment rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentType {
    Category,
    MenuItem,
}

impl AssignmentType {
    /// Stable string form, used as a storage index key component
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Category => "category",
            AssignmentType::MenuItem => "menuItem",
        }
    }
}

/// A rule mapping a category or menu item to a destination printer
///
/// No two active assignments may share `(printer_id, target_id,
/// assignment_type)`. `priority` defaults to 0 and only tie-breaks
/// among printers resolved from the same tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub printer_id: String,
    pub printer_name: String,
    pub printer_address: String,
    pub assignment_type: AssignmentType,
    pub target_id: String,
    pub target_name: String,
    pub priority: i32,
    pub is_active: bool,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis
    pub updated_at: i64,
}

impl Assignment {
    /// The transient destination this assignment resolves to
    pub fn destination(&self) -> PrinterDestination {
        PrinterDestination {
            printer_id: self.printer_id.clone(),
            address: self.printer_address.clone(),
            display_name: self.printer_name.clone(),
        }
    }
}

/// A resolved destination printer (derived, never persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDestination {
    pub printer_id: String,
    pub address: String,
    pub display_name: String,
}

/// Order line-item as consumed by routing
///
/// The logical item instance is identified by `(menu_item_id, id)`:
/// duplicate line items for the same menu item are tracked
/// independently. `sent_to_kitchen` transitions false -> true only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub menu_item_id: String,
    pub category_id: String,
    pub name: String,
    pub quantity: i32,
    pub special_instructions: Option<String>,
    pub notes: Option<String>,
    pub sent_to_kitchen: bool,
}

/// Service style of an order, drives the ticket header band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderKind {
    DineIn,
    TakeOut,
    Delivery,
}

impl OrderKind {
    pub fn header_label(&self) -> &'static str {
        match self {
            OrderKind::DineIn => "DINE IN ORDER",
            OrderKind::TakeOut => "TAKE OUT ORDER",
            OrderKind::Delivery => "DELIVERY ORDER",
        }
    }
}

/// Order as consumed by routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub kind: OrderKind,
    pub table_name: Option<String>,
    pub customer_name: Option<String>,
    /// Order-level special instructions (rendered in their own block)
    pub special_instructions: Option<String>,
    /// Unix millis
    pub created_at: i64,
    pub items: Vec<OrderItem>,
}

/// Caller-supplied context for a dispatch call
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Server name override; falls back to the order's customer name
    pub server_name: Option<String>,
    pub guest_count: Option<u32>,
    /// category_id -> display name; when every routed item resolves,
    /// the ticket groups items by category
    pub category_names: HashMap<String, String>,
    /// Reprint counter; > 0 adds a reprint banner to the ticket
    pub print_count: u32,
}

/// Result of a dispatch call
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Dispatched(DispatchReport),
    /// A dispatch for the same order id is already in flight
    AlreadySending,
}

impl DispatchOutcome {
    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            DispatchOutcome::Dispatched(r) => Some(r),
            DispatchOutcome::AlreadySending => None,
        }
    }
}

/// Aggregate outcome of one dispatch cycle
///
/// `success` refers to the order being saved, not to every printer
/// having accepted its ticket: printer failures and timeouts are
/// reported via `failed_printers` / `timed_out` and never flip
/// `success` to false.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub success: bool,
    pub items_sent: usize,
    /// Distinct physical printers dispatched to
    pub printer_count: usize,
    /// Printers that refused the send, timed out, or were never
    /// reached before the overall deadline
    pub failed_printers: Vec<String>,
    /// The overall dispatch deadline fired before every printer was tried
    pub timed_out: bool,
    /// Item list with `sent_to_kitchen` flags applied, for the caller
    /// to persist with the order
    pub updated_items: Vec<OrderItem>,
}

/// Assignment rule statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub total_assignments: usize,
    pub category_assignments: usize,
    pub menu_item_assignments: usize,
    /// Distinct printers referenced by active assignments
    pub active_printers: usize,
}
