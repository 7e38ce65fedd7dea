//! Pending item detection

use crate::types::{Order, OrderItem};

/// Items of the order that have not yet been sent to the kitchen.
///
/// Pure filter over `sent_to_kitchen`, O(n). Duplicate line items for
/// the same menu item are independent instances: the flag lives on the
/// line item, keyed by `(menu_item_id, id)`.
pub fn pending_items(order: &Order) -> Vec<OrderItem> {
    order
        .items
        .iter()
        .filter(|item| !item.sent_to_kitchen)
        .cloned()
        .collect()
}
