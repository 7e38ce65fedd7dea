//! Kitchen dispatcher
//!
//! Orchestrates one dispatch cycle: resolve destinations for every new
//! item, deduplicate to distinct physical printers, render and send a
//! ticket per printer under its own timeout, mark attempted items as
//! sent, and record counters plus an operation-log entry.
//!
//! Printer failures never escalate: a timeout or refused send fails
//! that printer only, and even the overall dispatch deadline expiring
//! still reports the order as saved.

use dashmap::DashSet;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::detector::pending_items;
use super::metrics::DispatchMetrics;
use crate::assignments::AssignmentService;
use crate::config::RouterConfig;
use crate::oplog::OperationLogger;
use crate::registry::PrinterRegistry;
use crate::ticket::TicketRenderer;
use crate::transport::{DestinationKind, PrinterTransport};
use crate::types::{
    Assignment, DispatchContext, DispatchOutcome, DispatchReport, Order, OrderItem,
    PrinterDestination,
};

/// Outcome of one printer send, timeout kept distinct from failure so
/// the orchestration layer decides what a timeout means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transport returned; `true` means the printer accepted
    Completed(bool),
    /// The per-printer deadline expired
    TimedOut,
}

impl SendOutcome {
    fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Completed(true))
    }
}

#[derive(Debug, Clone)]
struct SendRecord {
    printer_id: String,
    outcome: SendOutcome,
}

/// Items grouped under one distinct physical printer
struct PrinterGroup {
    destination: PrinterDestination,
    items: Vec<OrderItem>,
    /// Logical item identities already in this group
    seen: HashSet<(String, String)>,
}

pub struct KitchenDispatcher {
    assignments: Arc<AssignmentService>,
    registry: Arc<dyn PrinterRegistry>,
    transport: Arc<dyn PrinterTransport>,
    oplog: Arc<dyn OperationLogger>,
    renderer: TicketRenderer,
    printer_timeout: Duration,
    dispatch_timeout: Duration,
    fallback_printer_id: String,
    mark_sent_on_failure: bool,
    /// Order ids with a dispatch currently in flight
    in_flight: DashSet<String>,
    metrics: Arc<DispatchMetrics>,
}

/// Removes the order id from the in-flight set on every exit path
struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

impl KitchenDispatcher {
    pub fn new(
        config: &RouterConfig,
        assignments: Arc<AssignmentService>,
        registry: Arc<dyn PrinterRegistry>,
        transport: Arc<dyn PrinterTransport>,
        oplog: Arc<dyn OperationLogger>,
    ) -> Self {
        Self {
            assignments,
            registry,
            transport,
            oplog,
            renderer: TicketRenderer::new(config.paper_width, config.timezone),
            printer_timeout: config.printer_timeout,
            dispatch_timeout: config.dispatch_timeout,
            fallback_printer_id: config.fallback_printer_id.clone(),
            mark_sent_on_failure: config.mark_sent_on_failure,
            in_flight: DashSet::new(),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    /// Dispatch the order's not-yet-sent items to their printers.
    ///
    /// Returns [`DispatchOutcome::AlreadySending`] without touching any
    /// printer when a dispatch for the same order id is in flight.
    #[instrument(skip(self, order, ctx), fields(order_id = %order.id, order_number = %order.order_number))]
    pub async fn dispatch(&self, order: &Order, ctx: &DispatchContext) -> DispatchOutcome {
        if !self.in_flight.insert(order.id.clone()) {
            warn!("Dispatch already in flight for this order");
            return DispatchOutcome::AlreadySending;
        }
        let _guard = InFlightGuard {
            set: &self.in_flight,
            key: order.id.clone(),
        };

        let new_items = pending_items(order);
        if new_items.is_empty() {
            return DispatchOutcome::Dispatched(DispatchReport {
                success: true,
                items_sent: 0,
                printer_count: 0,
                failed_printers: Vec::new(),
                timed_out: false,
                updated_items: order.items.clone(),
            });
        }

        let groups = self.group_by_printer(&new_items).await;
        let total_printers = groups.len();

        // Records accumulate behind a shared handle so sends completed
        // before the overall deadline survive the loop being dropped
        let records: Arc<Mutex<Vec<SendRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let timed_out = tokio::time::timeout(
            self.dispatch_timeout,
            self.send_all(order, ctx, &groups, records.clone()),
        )
        .await
        .is_err();

        if timed_out {
            warn!(
                total_printers = total_printers,
                "Dispatch deadline expired; order is saved, remaining printers skipped"
            );
        }

        let records = records.lock().unwrap().clone();
        let mut failed_printers: Vec<String> = records
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.printer_id.clone())
            .collect();
        // Printers the expired deadline cut off never produced a
        // record; report them failed so staff know where to resend
        let attempted: HashSet<&str> = records
            .iter()
            .map(|r| r.printer_id.as_str())
            .collect();
        for group in &groups {
            if !attempted.contains(group.destination.printer_id.as_str()) {
                failed_printers.push(group.destination.printer_id.clone());
            }
        }
        let succeeded: HashSet<&str> = records
            .iter()
            .filter(|r| r.outcome.is_success())
            .map(|r| r.printer_id.as_str())
            .collect();

        // Once an attempt is logged the item is not auto-resent; under
        // the strict policy only items a printer accepted are marked
        let sent_ids: HashSet<(String, String)> = if self.mark_sent_on_failure {
            new_items
                .iter()
                .map(|i| (i.menu_item_id.clone(), i.id.clone()))
                .collect()
        } else {
            groups
                .iter()
                .filter(|g| succeeded.contains(g.destination.printer_id.as_str()))
                .flat_map(|g| {
                    g.items
                        .iter()
                        .map(|i| (i.menu_item_id.clone(), i.id.clone()))
                })
                .collect()
        };

        let updated_items: Vec<OrderItem> = order
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                if sent_ids.contains(&(item.menu_item_id.clone(), item.id.clone())) {
                    item.sent_to_kitchen = true;
                }
                item
            })
            .collect();
        let items_sent = sent_ids.len();

        self.metrics.record_order(items_sent);
        self.oplog
            .log(
                &order.id,
                &order.order_number,
                "sentToKitchen",
                json!({
                    "printerCount": records.len(),
                    "itemsSent": items_sent,
                    "totalPrinters": total_printers,
                }),
            )
            .await;

        info!(
            items_sent = items_sent,
            printers = total_printers,
            failed = failed_printers.len(),
            timed_out = timed_out,
            "Dispatch cycle finished"
        );

        DispatchOutcome::Dispatched(DispatchReport {
            success: true,
            items_sent,
            printer_count: total_printers,
            failed_printers,
            timed_out,
            updated_items,
        })
    }

    /// Resolve every new item and build the deduplicated printer fan-out.
    ///
    /// Each distinct printer appears once, carrying the union of items
    /// assigned to it, in first-seen order. Items with no matching rule
    /// go to the fallback destination.
    async fn group_by_printer(&self, new_items: &[OrderItem]) -> Vec<PrinterGroup> {
        let mut groups: Vec<PrinterGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for item in new_items {
            let resolved = self
                .assignments
                .resolve(&item.menu_item_id, &item.category_id)
                .await;

            let destinations: Vec<PrinterDestination> = if resolved.is_empty() {
                vec![self.fallback_destination().await]
            } else {
                resolved.iter().map(Assignment::destination).collect()
            };

            for dest in destinations {
                let pos = *index.entry(dest.printer_id.clone()).or_insert_with(|| {
                    groups.push(PrinterGroup {
                        destination: dest.clone(),
                        items: Vec::new(),
                        seen: HashSet::new(),
                    });
                    groups.len() - 1
                });

                let group = &mut groups[pos];
                let key = (item.menu_item_id.clone(), item.id.clone());
                if group.seen.insert(key) {
                    group.items.push(item.clone());
                }
            }
        }

        groups
    }

    /// The well-known destination for items no rule covers
    async fn fallback_destination(&self) -> PrinterDestination {
        match self.registry.get(&self.fallback_printer_id).await {
            Some(info) => PrinterDestination {
                printer_id: self.fallback_printer_id.clone(),
                address: info.address,
                display_name: info.name,
            },
            None => PrinterDestination {
                printer_id: self.fallback_printer_id.clone(),
                address: String::new(),
                display_name: "Default Printer".to_string(),
            },
        }
    }

    /// Send a ticket to each printer sequentially, each under its own
    /// timeout. One printer failing or timing out never aborts the rest.
    async fn send_all(
        &self,
        order: &Order,
        ctx: &DispatchContext,
        groups: &[PrinterGroup],
        records: Arc<Mutex<Vec<SendRecord>>>,
    ) {
        for group in groups {
            let dest = &group.destination;
            let data = self.renderer.render(order, &group.items, dest, ctx);

            let outcome = match tokio::time::timeout(
                self.printer_timeout,
                self.transport
                    .send(&dest.address, &data, DestinationKind::Kitchen),
            )
            .await
            {
                Ok(accepted) => SendOutcome::Completed(accepted),
                Err(_) => SendOutcome::TimedOut,
            };

            self.metrics.record_printer(
                &dest.printer_id,
                outcome.is_success(),
                chrono::Utc::now().timestamp_millis(),
            );

            match outcome {
                SendOutcome::Completed(true) => info!(
                    printer = %dest.display_name,
                    bytes = data.len(),
                    items = group.items.len(),
                    "Ticket sent"
                ),
                SendOutcome::Completed(false) => error!(
                    printer = %dest.display_name,
                    address = %dest.address,
                    "Printer send failed"
                ),
                SendOutcome::TimedOut => error!(
                    printer = %dest.display_name,
                    timeout_ms = self.printer_timeout.as_millis() as u64,
                    "Printer send timed out"
                ),
            }

            records.lock().unwrap().push(SendRecord {
                printer_id: dest.printer_id.clone(),
                outcome,
            });
        }
    }
}

impl std::fmt::Debug for KitchenDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenDispatcher")
            .field("printer_timeout", &self.printer_timeout)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("fallback_printer_id", &self.fallback_printer_id)
            .finish_non_exhaustive()
    }
}
