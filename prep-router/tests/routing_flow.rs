//! End-to-end routing flow over file-backed storage.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use prep_router::assignments::{AssignmentService, AssignmentStorage};
use prep_router::catalog::MemoryTargetCatalog;
use prep_router::dispatch::KitchenDispatcher;
use prep_router::oplog::MemoryOperationLogger;
use prep_router::reconcile::SyncReconciler;
use prep_router::registry::{MemoryPrinterRegistry, PrinterInfo};
use prep_router::transport::{DestinationKind, PrinterTransport};
use prep_router::{
    AssignmentType, DispatchContext, Order, OrderItem, OrderKind, RouterConfig,
};

/// Captures every send with its rendered payload
#[derive(Default)]
struct CapturingTransport {
    sends: Mutex<Vec<(String, Vec<u8>)>>,
    fail_addresses: HashSet<String>,
}

impl CapturingTransport {
    fn sends(&self) -> Vec<(String, Vec<u8>)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrinterTransport for CapturingTransport {
    async fn send(&self, address: &str, data: &[u8], _kind: DestinationKind) -> bool {
        self.sends
            .lock()
            .unwrap()
            .push((address.to_string(), data.to_vec()));
        !self.fail_addresses.contains(address)
    }
}

fn test_config() -> RouterConfig {
    RouterConfig {
        printer_timeout: Duration::from_millis(200),
        dispatch_timeout: Duration::from_millis(1000),
        reconcile_interval: Duration::from_millis(20),
        fallback_printer_id: "default_printer".to_string(),
        paper_width: 48,
        timezone: chrono_tz::Europe::Madrid,
        mark_sent_on_failure: true,
    }
}

async fn registry_with(printers: &[(&str, &str, &str)]) -> Arc<MemoryPrinterRegistry> {
    let registry = Arc::new(MemoryPrinterRegistry::new());
    for (id, name, addr) in printers {
        registry
            .insert(
                *id,
                PrinterInfo {
                    name: name.to_string(),
                    address: addr.to_string(),
                    kind: DestinationKind::Kitchen,
                },
            )
            .await;
    }
    registry
}

fn item(id: &str, menu_item_id: &str, category_id: &str, name: &str) -> OrderItem {
    OrderItem {
        id: id.to_string(),
        menu_item_id: menu_item_id.to_string(),
        category_id: category_id.to_string(),
        name: name.to_string(),
        quantity: 1,
        special_instructions: None,
        notes: None,
        sent_to_kitchen: false,
    }
}

fn dine_in_order(id: &str, items: Vec<OrderItem>) -> Order {
    Order {
        id: id.to_string(),
        order_number: "1024".to_string(),
        kind: OrderKind::DineIn,
        table_name: Some("12".to_string()),
        customer_name: None,
        special_instructions: None,
        created_at: 1_705_912_335_000,
        items,
    }
}

#[tokio::test]
async fn test_menu_item_rule_overrides_category_rule() {
    let registry = registry_with(&[
        ("grill", "Grill Station", "10.0.0.1:9100"),
        ("oven", "Oven Station", "10.0.0.2:9100"),
    ])
    .await;
    let service = Arc::new(AssignmentService::new(
        AssignmentStorage::open_in_memory().unwrap(),
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));

    // Category rule covers all mains, menu-item rule overrides for the
    // burger specifically
    service
        .add("oven", AssignmentType::Category, "mains", "Mains", 0)
        .await
        .unwrap();
    service
        .add("grill", AssignmentType::MenuItem, "burger", "Burger", 0)
        .await
        .unwrap();

    let transport = Arc::new(CapturingTransport::default());
    let oplog = Arc::new(MemoryOperationLogger::new());
    let dispatcher = KitchenDispatcher::new(
        &test_config(),
        service.clone(),
        registry,
        transport.clone(),
        oplog,
    );

    let order = dine_in_order(
        "o1",
        vec![
            item("i1", "burger", "mains", "Burger"),
            item("i2", "lasagna", "mains", "Lasagna"),
        ],
    );
    let outcome = dispatcher.dispatch(&order, &DispatchContext::default()).await;

    let report = outcome.report().unwrap();
    assert!(report.success);
    assert_eq!(report.printer_count, 2);
    assert_eq!(report.items_sent, 2);

    let sends = transport.sends();
    let addresses: Vec<&str> = sends.iter().map(|(a, _)| a.as_str()).collect();
    assert!(addresses.contains(&"10.0.0.1:9100"));
    assert!(addresses.contains(&"10.0.0.2:9100"));

    // The grill ticket carries the burger, not the lasagna
    let grill_ticket = &sends
        .iter()
        .find(|(a, _)| a == "10.0.0.1:9100")
        .unwrap()
        .1;
    let text = String::from_utf8_lossy(grill_ticket);
    assert!(text.contains("Burger"));
    assert!(!text.contains("Lasagna"));
}

#[tokio::test]
async fn test_rendered_ticket_carries_order_header() {
    let registry = registry_with(&[("default_printer", "Kitchen", "10.0.0.9:9100")]).await;
    let service = Arc::new(AssignmentService::new(
        AssignmentStorage::open_in_memory().unwrap(),
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));

    let transport = Arc::new(CapturingTransport::default());
    let dispatcher = KitchenDispatcher::new(
        &test_config(),
        service,
        registry,
        transport.clone(),
        Arc::new(MemoryOperationLogger::new()),
    );

    let order = dine_in_order("o1", vec![item("i1", "burger", "mains", "Burger")]);
    let ctx = DispatchContext {
        server_name: Some("Alice".to_string()),
        guest_count: Some(4),
        ..Default::default()
    };
    dispatcher.dispatch(&order, &ctx).await;

    let sends = transport.sends();
    assert_eq!(sends.len(), 1);
    let text = String::from_utf8_lossy(&sends[0].1);
    assert!(text.contains("DINE IN ORDER"));
    assert!(text.contains("Order #1024"));
    assert!(text.contains("Server: Alice"));
    assert!(text.contains("Table: 12 (4 guests)"));
    assert!(text.contains("1x Burger"));
    // ESC/POS init prefix and full-cut suffix
    assert_eq!(&sends[0].1[..2], &[0x1B, 0x40]);
    assert!(sends[0].1.ends_with(&[0x1D, 0x56, 0x00]));
}

#[tokio::test]
async fn test_assignments_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("assignments.redb");

    let registry = registry_with(&[("grill", "Grill Station", "10.0.0.1:9100")]).await;

    {
        let storage = AssignmentStorage::open(&db_path).unwrap();
        let service = AssignmentService::new(
            storage,
            registry.clone(),
            Arc::new(MemoryTargetCatalog::new()),
        );
        service
            .add("grill", AssignmentType::MenuItem, "burger", "Burger", 5)
            .await
            .unwrap();
        service
            .add("grill", AssignmentType::Category, "sides", "Sides", 0)
            .await
            .unwrap();
    }

    // Fresh process over the same file
    let storage = AssignmentStorage::open(&db_path).unwrap();
    let service = AssignmentService::new(
        storage,
        registry,
        Arc::new(MemoryTargetCatalog::new()),
    );
    assert_eq!(service.warm_up().await.unwrap(), 2);

    let resolved = service.resolve("burger", "mains").await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].printer_id, "grill");
    assert_eq!(resolved[0].priority, 5);

    let stats = service.stats().await;
    assert_eq!(stats.total_assignments, 2);
    assert_eq!(stats.active_printers, 1);
}

#[tokio::test]
async fn test_failed_printer_marks_items_and_logs_operation() {
    let registry = registry_with(&[("grill", "Grill Station", "10.0.0.1:9100")]).await;
    let service = Arc::new(AssignmentService::new(
        AssignmentStorage::open_in_memory().unwrap(),
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));
    service
        .add("grill", AssignmentType::Category, "mains", "Mains", 0)
        .await
        .unwrap();

    let transport = Arc::new(CapturingTransport {
        fail_addresses: ["10.0.0.1:9100".to_string()].into_iter().collect(),
        ..Default::default()
    });
    let oplog = Arc::new(MemoryOperationLogger::new());
    let dispatcher = KitchenDispatcher::new(
        &test_config(),
        service,
        registry,
        transport.clone(),
        oplog.clone(),
    );

    let order = dine_in_order("o1", vec![item("i1", "burger", "mains", "Burger")]);
    let outcome = dispatcher.dispatch(&order, &DispatchContext::default()).await;

    let report = outcome.report().unwrap();
    assert!(report.success);
    assert_eq!(report.failed_printers, vec!["grill".to_string()]);
    assert!(report.updated_items[0].sent_to_kitchen);

    // The operation is logged either way so staff can reprint by hand
    let entries = oplog.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "sentToKitchen");
    assert_eq!(entries[0].metadata["totalPrinters"], 1);
}

#[tokio::test]
async fn test_reconciler_heals_cache_drift_in_background() {
    let registry = registry_with(&[("grill", "Grill Station", "10.0.0.1:9100")]).await;
    let storage = AssignmentStorage::open_in_memory().unwrap();
    let service = Arc::new(AssignmentService::new(
        storage.clone(),
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));

    // Write through a second service sharing the storage; the first
    // service's cache never hears about it
    let other = AssignmentService::new(
        storage,
        registry,
        Arc::new(MemoryTargetCatalog::new()),
    );
    other
        .add("grill", AssignmentType::MenuItem, "burger", "Burger", 0)
        .await
        .unwrap();
    assert_eq!(service.cached_active_count().await, 0);

    let token = CancellationToken::new();
    let reconciler = SyncReconciler::new(service.clone(), Duration::from_millis(20));
    let handle = tokio::spawn(reconciler.run(token.clone()));

    // A few intervals are plenty
    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    handle.await.unwrap();

    assert_eq!(service.cached_active_count().await, 1);
    assert_eq!(service.resolve("burger", "mains").await.len(), 1);
}

#[tokio::test]
async fn test_priority_orders_printers_within_a_tier() {
    let registry = registry_with(&[
        ("grill", "Grill Station", "10.0.0.1:9100"),
        ("expo", "Expo Station", "10.0.0.2:9100"),
    ])
    .await;
    let service = Arc::new(AssignmentService::new(
        AssignmentStorage::open_in_memory().unwrap(),
        registry.clone(),
        Arc::new(MemoryTargetCatalog::new()),
    ));

    service
        .add("grill", AssignmentType::Category, "mains", "Mains", 1)
        .await
        .unwrap();
    service
        .add("expo", AssignmentType::Category, "mains", "Mains", 9)
        .await
        .unwrap();

    let resolved = service.resolve("burger", "mains").await;
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].printer_id, "expo");
    assert_eq!(resolved[1].printer_id, "grill");

    // Fan-out order follows resolution order
    let transport = Arc::new(CapturingTransport::default());
    let dispatcher = KitchenDispatcher::new(
        &test_config(),
        service,
        registry,
        transport.clone(),
        Arc::new(MemoryOperationLogger::new()),
    );
    let order = dine_in_order("o1", vec![item("i1", "burger", "mains", "Burger")]);
    dispatcher.dispatch(&order, &DispatchContext::default()).await;

    let addresses: Vec<String> = transport.sends().into_iter().map(|(a, _)| a).collect();
    assert_eq!(addresses, vec!["10.0.0.2:9100", "10.0.0.1:9100"]);
}
