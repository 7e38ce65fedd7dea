//! Assignment cache reconciliation
//!
//! Background loop that periodically compares the persisted active
//! assignment count against the in-memory cache and reloads the cache
//! wholesale when they disagree. Count comparison is a cheap proxy:
//! content drift at equal counts is only repaired on the next
//! count-changing write.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::assignments::AssignmentService;
use crate::error::RouterResult;

pub struct SyncReconciler {
    assignments: Arc<AssignmentService>,
    interval: std::time::Duration,
}

impl SyncReconciler {
    pub fn new(assignments: Arc<AssignmentService>, interval: std::time::Duration) -> Self {
        Self {
            assignments,
            interval,
        }
    }

    /// Run the reconcile loop until the token is cancelled.
    ///
    /// A failed cycle is logged and retried at the next tick; the loop
    /// itself never dies.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        // First tick fires immediately; skip it so startup warmup owns
        // the initial load
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "Assignment reconciler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Assignment reconciler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.check_once().await {
                        error!(error = %e, "Assignment reconcile cycle failed");
                    }
                }
            }
        }
    }

    /// One reconcile cycle; returns true when drift was repaired
    pub async fn check_once(&self) -> RouterResult<bool> {
        let persisted = self.assignments.persisted_active_count()?;
        let cached = self.assignments.cached_active_count().await;

        if persisted == cached {
            debug!(count = persisted, "Assignment cache in sync");
            return Ok(false);
        }

        warn!(
            persisted = persisted,
            cached = cached,
            "Assignment cache drift detected, reloading from storage"
        );
        let reloaded = self.assignments.reload_from_storage().await?;
        info!(active = reloaded, "Assignment cache reloaded");
        Ok(true)
    }
}

impl std::fmt::Debug for SyncReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReconciler")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignments::AssignmentStorage;
    use crate::catalog::MemoryTargetCatalog;
    use crate::registry::{MemoryPrinterRegistry, PrinterInfo};
    use crate::transport::DestinationKind;
    use crate::types::AssignmentType;
    use std::time::Duration;

    async fn seeded_service() -> (Arc<AssignmentService>, AssignmentStorage) {
        let registry = Arc::new(MemoryPrinterRegistry::new());
        registry
            .insert(
                "p1",
                PrinterInfo {
                    name: "Grill".to_string(),
                    address: "127.0.0.1:9100".to_string(),
                    kind: DestinationKind::Kitchen,
                },
            )
            .await;
        let storage = AssignmentStorage::open_in_memory().unwrap();
        let service = Arc::new(AssignmentService::new(
            storage.clone(),
            registry,
            Arc::new(MemoryTargetCatalog::new()),
        ));
        (service, storage)
    }

    #[tokio::test]
    async fn test_in_sync_is_a_no_op() {
        let (service, _storage) = seeded_service().await;
        service
            .add("p1", AssignmentType::MenuItem, "burger", "Burger", 0)
            .await
            .unwrap();

        let reconciler = SyncReconciler::new(service.clone(), Duration::from_secs(30));
        assert!(!reconciler.check_once().await.unwrap());
        assert_eq!(service.cached_active_count().await, 1);
    }

    #[tokio::test]
    async fn test_drift_triggers_reload() {
        let (service, storage) = seeded_service().await;
        service
            .add("p1", AssignmentType::MenuItem, "burger", "Burger", 0)
            .await
            .unwrap();

        // Out-of-band write the cache never saw
        {
            let other = AssignmentService::new(
                storage,
                Arc::new({
                    let r = MemoryPrinterRegistry::new();
                    r.insert(
                        "p1",
                        PrinterInfo {
                            name: "Grill".to_string(),
                            address: "127.0.0.1:9100".to_string(),
                            kind: DestinationKind::Kitchen,
                        },
                    )
                    .await;
                    r
                }),
                Arc::new(MemoryTargetCatalog::new()),
            );
            other
                .add("p1", AssignmentType::Category, "mains", "Mains", 0)
                .await
                .unwrap();
        }

        assert_eq!(service.cached_active_count().await, 1);

        let reconciler = SyncReconciler::new(service.clone(), Duration::from_secs(30));
        assert!(reconciler.check_once().await.unwrap());
        assert_eq!(service.cached_active_count().await, 2);
        assert!(!service.resolve("pizza", "mains").await.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (service, _storage) = seeded_service().await;
        let reconciler = SyncReconciler::new(service, Duration::from_millis(10));

        let token = CancellationToken::new();
        let handle = tokio::spawn(reconciler.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
