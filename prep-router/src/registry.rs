//! Printer configuration lookup
//!
//! Printer provisioning itself is owned by another subsystem; routing
//! only needs `get(printer_id)` at the boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::transport::DestinationKind;

/// Printer configuration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub name: String,
    /// Network address, e.g. "192.168.1.50:9100"
    pub address: String,
    pub kind: DestinationKind,
}

/// Printer configuration collaborator
#[async_trait]
pub trait PrinterRegistry: Send + Sync {
    async fn get(&self, printer_id: &str) -> Option<PrinterInfo>;
}

/// In-memory printer registry
///
/// Backing implementation for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryPrinterRegistry {
    printers: RwLock<HashMap<String, PrinterInfo>>,
}

impl MemoryPrinterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, printer_id: impl Into<String>, info: PrinterInfo) {
        self.printers.write().await.insert(printer_id.into(), info);
    }

    pub async fn remove(&self, printer_id: &str) {
        self.printers.write().await.remove(printer_id);
    }
}

#[async_trait]
impl PrinterRegistry for MemoryPrinterRegistry {
    async fn get(&self, printer_id: &str) -> Option<PrinterInfo> {
        self.printers.read().await.get(printer_id).cloned()
    }
}
