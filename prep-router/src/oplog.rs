//! Operation log boundary
//!
//! Every dispatch cycle records one entry, independent of outcome, so
//! failed prints can be remediated by hand.

use async_trait::async_trait;
use tracing::info;

/// Operation logging collaborator
#[async_trait]
pub trait OperationLogger: Send + Sync {
    async fn log(
        &self,
        order_id: &str,
        order_number: &str,
        action: &str,
        metadata: serde_json::Value,
    );
}

/// Operation logger that emits structured tracing events
#[derive(Debug, Default, Clone)]
pub struct TracingOperationLogger;

#[async_trait]
impl OperationLogger for TracingOperationLogger {
    async fn log(
        &self,
        order_id: &str,
        order_number: &str,
        action: &str,
        metadata: serde_json::Value,
    ) {
        info!(
            order_id = %order_id,
            order_number = %order_number,
            action = %action,
            metadata = %metadata,
            "Operation logged"
        );
    }
}

/// Operation logger that records entries in memory (test support)
#[derive(Debug, Default)]
pub struct MemoryOperationLogger {
    entries: tokio::sync::Mutex<Vec<OperationLogEntry>>,
}

#[derive(Debug, Clone)]
pub struct OperationLogEntry {
    pub order_id: String,
    pub order_number: String,
    pub action: String,
    pub metadata: serde_json::Value,
}

impl MemoryOperationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<OperationLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl OperationLogger for MemoryOperationLogger {
    async fn log(
        &self,
        order_id: &str,
        order_number: &str,
        action: &str,
        metadata: serde_json::Value,
    ) {
        self.entries.lock().await.push(OperationLogEntry {
            order_id: order_id.to_string(),
            order_number: order_number.to_string(),
            action: action.to_string(),
            metadata,
        });
    }
}
