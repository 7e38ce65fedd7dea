//! Dispatch observability counters

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Running counters for dispatch activity
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    printer_success: DashMap<String, u64>,
    printer_failure: DashMap<String, u64>,
    total_items_sent: AtomicU64,
    total_orders_sent: AtomicU64,
    /// Unix millis of the last successful printer send; 0 = never
    last_successful_send: AtomicI64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub printer_success: HashMap<String, u64>,
    pub printer_failure: HashMap<String, u64>,
    pub total_items_sent: u64,
    pub total_orders_sent: u64,
    pub last_successful_send: Option<i64>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one printer send attempt
    pub fn record_printer(&self, printer_id: &str, ok: bool, now_millis: i64) {
        let counters = if ok {
            &self.printer_success
        } else {
            &self.printer_failure
        };
        *counters.entry(printer_id.to_string()).or_insert(0) += 1;

        if ok {
            self.last_successful_send
                .fetch_max(now_millis, Ordering::Relaxed);
        }
    }

    pub fn record_order(&self, items_sent: usize) {
        self.total_orders_sent.fetch_add(1, Ordering::Relaxed);
        self.total_items_sent
            .fetch_add(items_sent as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_successful_send.load(Ordering::Relaxed);
        MetricsSnapshot {
            printer_success: self
                .printer_success
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            printer_failure: self
                .printer_failure
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            total_items_sent: self.total_items_sent.load(Ordering::Relaxed),
            total_orders_sent: self.total_orders_sent.load(Ordering::Relaxed),
            last_successful_send: (last > 0).then_some(last),
        }
    }
}
