//! Routes a sample order through the full stack and prints the
//! tickets that would reach each printer.
//!
//! ```sh
//! cargo run -p prep-router --example route_demo
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use prep_router::assignments::{AssignmentService, AssignmentStorage};
use prep_router::catalog::MemoryTargetCatalog;
use prep_router::dispatch::KitchenDispatcher;
use prep_router::oplog::TracingOperationLogger;
use prep_router::registry::{MemoryPrinterRegistry, PrinterInfo};
use prep_router::transport::{DestinationKind, PrinterTransport};
use prep_router::{
    AssignmentType, DispatchContext, Order, OrderItem, OrderKind, RouterConfig,
};

/// Prints each ticket to stdout instead of a real printer
struct ConsoleTransport;

#[async_trait]
impl PrinterTransport for ConsoleTransport {
    async fn send(&self, address: &str, data: &[u8], _kind: DestinationKind) -> bool {
        println!("--- ticket for {} ({} bytes) ---", address, data.len());
        // Strip ESC/POS control bytes for display
        let text: String = data
            .iter()
            .filter(|b| b.is_ascii_graphic() || **b == b' ' || **b == b'\n')
            .map(|b| *b as char)
            .collect();
        println!("{}", text);
        true
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    prep_router::logger::init_logger();

    let config = RouterConfig::from_env();

    let registry = Arc::new(MemoryPrinterRegistry::new());
    registry
        .insert(
            "grill",
            PrinterInfo {
                name: "Grill Station".to_string(),
                address: "192.168.1.50:9100".to_string(),
                kind: DestinationKind::Kitchen,
            },
        )
        .await;
    registry
        .insert(
            "fryer",
            PrinterInfo {
                name: "Fryer Station".to_string(),
                address: "192.168.1.51:9100".to_string(),
                kind: DestinationKind::Kitchen,
            },
        )
        .await;

    let service = Arc::new(AssignmentService::new(
        AssignmentStorage::open_in_memory()?,
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));
    service
        .add("grill", AssignmentType::Category, "mains", "Mains", 0)
        .await?;
    service
        .add("fryer", AssignmentType::MenuItem, "fries", "French Fries", 0)
        .await?;

    let dispatcher = KitchenDispatcher::new(
        &config,
        service,
        registry,
        Arc::new(ConsoleTransport),
        Arc::new(TracingOperationLogger),
    );

    let order = Order {
        id: "demo-order".to_string(),
        order_number: "1024".to_string(),
        kind: OrderKind::DineIn,
        table_name: Some("12".to_string()),
        customer_name: None,
        special_instructions: Some("Birthday table".to_string()),
        created_at: chrono::Utc::now().timestamp_millis(),
        items: vec![
            OrderItem {
                id: "line-1".to_string(),
                menu_item_id: "burger".to_string(),
                category_id: "mains".to_string(),
                name: "Smash Burger".to_string(),
                quantity: 2,
                special_instructions: Some("No onions".to_string()),
                notes: None,
                sent_to_kitchen: false,
            },
            OrderItem {
                id: "line-2".to_string(),
                menu_item_id: "fries".to_string(),
                category_id: "sides".to_string(),
                name: "French Fries".to_string(),
                quantity: 1,
                special_instructions: None,
                notes: Some("Extra crispy".to_string()),
                sent_to_kitchen: false,
            },
        ],
    };

    let ctx = DispatchContext {
        server_name: Some("Alice".to_string()),
        guest_count: Some(4),
        category_names: [
            ("mains".to_string(), "Mains".to_string()),
            ("sides".to_string(), "Sides".to_string()),
        ]
        .into_iter()
        .collect(),
        print_count: 0,
    };

    let outcome = dispatcher.dispatch(&order, &ctx).await;
    if let Some(report) = outcome.report() {
        println!(
            "dispatched {} item(s) to {} printer(s), {} failure(s)",
            report.items_sent,
            report.printer_count,
            report.failed_printers.len()
        );
    }

    Ok(())
}
