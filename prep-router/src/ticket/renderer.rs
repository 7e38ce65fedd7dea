//! Kitchen ticket renderer
//!
//! Renders order items into ESC/POS bytes for thermal printers.
//! Rendering is deterministic: identical inputs produce identical
//! bytes. A failed rich render falls back to a plain-text ticket with
//! the same information so a malformed order never blocks printing.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use prep_printer::TicketBuilder;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{DispatchContext, Order, OrderItem, PrinterDestination};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Invalid order timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Kitchen ticket renderer
pub struct TicketRenderer {
    width: usize,
    timezone: Tz,
}

impl TicketRenderer {
    /// Create a renderer for the given paper width and timezone
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self { width, timezone }
    }

    /// Render a ticket, falling back to plain text on error
    pub fn render(
        &self,
        order: &Order,
        items: &[OrderItem],
        destination: &PrinterDestination,
        ctx: &DispatchContext,
    ) -> Vec<u8> {
        match self.try_render(order, items, destination, ctx) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %e,
                    "Rich ticket render failed, falling back to plain text"
                );
                self.render_plain(order, items, destination)
            }
        }
    }

    /// Render the full ticket layout
    pub fn try_render(
        &self,
        order: &Order,
        items: &[OrderItem],
        destination: &PrinterDestination,
        ctx: &DispatchContext,
    ) -> Result<Vec<u8>, TicketError> {
        let created: DateTime<Utc> = DateTime::from_timestamp_millis(order.created_at)
            .ok_or(TicketError::InvalidTimestamp(order.created_at))?;
        let local = created.with_timezone(&self.timezone);
        let ready_by = local + Duration::minutes(20);

        let mut b = TicketBuilder::new(self.width);

        // Header band
        b.center();
        b.double_size();
        b.bold();
        b.line(order.kind.header_label());
        b.bold_off();
        b.reset_size();
        b.sep_double();
        b.left();

        // Order metadata
        b.bold();
        b.line(&format!("Order #{}", order.order_number));
        b.bold_off();
        b.line(&format!("Station: {}", destination.display_name));

        let server = ctx
            .server_name
            .as_deref()
            .or(order.customer_name.as_deref())
            .unwrap_or("N/A");
        b.line(&format!("Server: {}", server));

        let table = order.table_name.as_deref().unwrap_or("N/A");
        match ctx.guest_count {
            Some(n) => b.line(&format!("Table: {} ({} guests)", table, n)),
            None => b.line(&format!("Table: {}", table)),
        };

        b.line(&format!("Date: {}", local.format("%m/%d/%Y")));
        b.line(&format!("Time: {}", local.format("%I:%M %p")));
        b.bold();
        b.line(&format!("Ready by: {}", ready_by.format("%I:%M %p")));
        b.bold_off();
        b.sep_double();

        // Items: grouped by category when every category resolves,
        // otherwise flat in original order
        match self.group_by_category(items, ctx) {
            Some(groups) => {
                for (name, group_items) in groups {
                    b.bold();
                    b.line(&name.to_uppercase());
                    b.bold_off();
                    b.sep_single();
                    for item in group_items {
                        self.render_item(&mut b, item);
                    }
                }
            }
            None => {
                for item in items {
                    self.render_item(&mut b, item);
                }
            }
        }

        b.sep_double();

        // Order-level special instructions
        if let Some(ref si) = order.special_instructions
            && !si.is_empty()
        {
            b.bold();
            b.double_height();
            b.line("SPECIAL INSTRUCTIONS");
            b.reset_size();
            b.line(si);
            b.bold_off();
        }

        // Reprint indicator
        if ctx.print_count > 0 {
            b.newline();
            b.center();
            b.bold();
            b.line(&format!("*** REPRINT #{} ***", ctx.print_count));
            b.bold_off();
            b.left();
        }

        b.feed(3);
        b.cut();

        Ok(b.build())
    }

    /// Group items by resolved category name, groups sorted by name.
    /// Returns None when any item's category cannot be resolved.
    fn group_by_category<'a>(
        &self,
        items: &'a [OrderItem],
        ctx: &DispatchContext,
    ) -> Option<Vec<(String, Vec<&'a OrderItem>)>> {
        if ctx.category_names.is_empty() {
            return None;
        }

        let mut groups: BTreeMap<String, Vec<&OrderItem>> = BTreeMap::new();
        for item in items {
            let name = ctx.category_names.get(&item.category_id)?;
            groups.entry(name.clone()).or_default().push(item);
        }

        Some(groups.into_iter().collect())
    }

    /// Render a single item line with its instruction sublines
    fn render_item(&self, b: &mut TicketBuilder, item: &OrderItem) {
        b.bold();
        b.double_height();
        b.line(&format!("{}x {}", item.quantity, item.name));
        b.reset_size();
        b.bold_off();

        if let Some(ref si) = item.special_instructions
            && !si.is_empty()
        {
            b.line(&format!("  -> {}", si));
        }

        if let Some(ref note) = item.notes
            && !note.is_empty()
        {
            b.line(&format!("  -> {}", note));
        }
    }

    /// Plain-text fallback ticket: same information, no styling
    fn render_plain(
        &self,
        order: &Order,
        items: &[OrderItem],
        destination: &PrinterDestination,
    ) -> Vec<u8> {
        let mut b = TicketBuilder::new(self.width);

        b.line(order.kind.header_label());
        b.line(&format!("Order #{}", order.order_number));
        b.line(&format!("Station: {}", destination.display_name));
        b.line(&format!(
            "Table: {}",
            order.table_name.as_deref().unwrap_or("N/A")
        ));
        b.line(&format!("Time: {}", order.created_at));
        b.sep_single();

        for item in items {
            b.line(&format!("{}x {}", item.quantity, item.name));
        }

        b.feed(3);
        b.cut();
        b.build()
    }
}

impl Default for TicketRenderer {
    fn default() -> Self {
        Self::new(48, chrono_tz::Europe::Madrid)
    }
}
