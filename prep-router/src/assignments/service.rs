//! Assignment service - rule CRUD with referential-integrity remediation
//!
//! Owns the persisted store and the in-memory cache. Mutations persist
//! first and only touch the cache after the storage commit succeeds, so
//! a failed transaction leaves the in-memory state unchanged.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::cache::AssignmentCache;
use super::storage::AssignmentStorage;
use crate::catalog::TargetCatalog;
use crate::error::{RouterError, RouterResult};
use crate::registry::PrinterRegistry;
use crate::types::{Assignment, AssignmentStats, AssignmentType};

#[derive(Clone)]
pub struct AssignmentService {
    storage: AssignmentStorage,
    cache: AssignmentCache,
    registry: Arc<dyn PrinterRegistry>,
    catalog: Arc<dyn TargetCatalog>,
    /// Serializes mutations and reloads end to end; reads go straight
    /// to the cache
    mutation_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AssignmentService {
    pub fn new(
        storage: AssignmentStorage,
        registry: Arc<dyn PrinterRegistry>,
        catalog: Arc<dyn TargetCatalog>,
    ) -> Self {
        Self {
            storage,
            cache: AssignmentCache::new(),
            registry,
            catalog,
            mutation_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Load persisted assignments into the cache (startup warmup)
    pub async fn warm_up(&self) -> RouterResult<usize> {
        let _guard = self.mutation_lock.lock().await;
        let assignments = self.storage.all()?;
        let count = assignments.len();
        self.cache.reload(assignments).await;
        Ok(count)
    }

    /// Add an assignment rule.
    ///
    /// Fails with [`RouterError::PrinterNotFound`] when the printer is
    /// unknown and with [`RouterError::DuplicateAssignment`] when an
    /// identical active tuple exists. A missing category/menu-item
    /// target is remediated by creating a placeholder row, never
    /// surfaced as an error.
    pub async fn add(
        &self,
        printer_id: &str,
        assignment_type: AssignmentType,
        target_id: &str,
        target_name: &str,
        priority: i32,
    ) -> RouterResult<Assignment> {
        let _guard = self.mutation_lock.lock().await;

        let printer = self
            .registry
            .get(printer_id)
            .await
            .ok_or_else(|| RouterError::PrinterNotFound(printer_id.to_string()))?;

        if self
            .cache
            .has_active(printer_id, target_id, assignment_type)
            .await
        {
            return Err(RouterError::DuplicateAssignment {
                printer_id: printer_id.to_string(),
                target_id: target_id.to_string(),
            });
        }

        if !self.catalog.exists(assignment_type, target_id).await {
            self.catalog
                .create_placeholder(assignment_type, target_id, target_name)
                .await;
            info!(
                target_id = %target_id,
                target_type = %assignment_type.as_str(),
                "Created placeholder target for assignment"
            );
        }

        let now = chrono::Utc::now().timestamp_millis();
        let assignment = Assignment {
            id: Uuid::new_v4().to_string(),
            printer_id: printer_id.to_string(),
            printer_name: printer.name,
            printer_address: printer.address,
            assignment_type,
            target_id: target_id.to_string(),
            target_name: target_name.to_string(),
            priority,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        // The cache may be cold (fresh process over an existing store),
        // so the persisted rows are the authority on tuple uniqueness
        if self
            .storage
            .has_active_tuple(&txn, printer_id, target_id, assignment_type)?
        {
            return Err(RouterError::DuplicateAssignment {
                printer_id: printer_id.to_string(),
                target_id: target_id.to_string(),
            });
        }
        self.storage.insert(&txn, &assignment)?;
        txn.commit().map_err(super::storage::StorageError::from)?;

        // Cache only after the commit succeeded
        self.cache.insert(assignment.clone()).await;

        info!(
            assignment_id = %assignment.id,
            printer_id = %printer_id,
            target_id = %target_id,
            priority = priority,
            "Assignment added"
        );

        Ok(assignment)
    }

    /// Soft-remove an assignment by id; returns false if unknown
    pub async fn remove(&self, assignment_id: &str) -> RouterResult<bool> {
        let _guard = self.mutation_lock.lock().await;
        let now = chrono::Utc::now().timestamp_millis();

        let txn = self.storage.begin_write()?;
        let found = self.storage.set_active(&txn, assignment_id, false, now)?;
        txn.commit().map_err(super::storage::StorageError::from)?;

        if !found {
            warn!(assignment_id = %assignment_id, "Remove requested for unknown assignment");
            return Ok(false);
        }

        self.cache.deactivate(assignment_id, now).await;
        info!(assignment_id = %assignment_id, "Assignment removed");
        Ok(true)
    }

    /// All cached assignments, insertion order, inactive included
    pub async fn all(&self) -> Vec<Assignment> {
        self.cache.all().await
    }

    /// Drop every assignment, persisted and cached
    pub async fn clear(&self) -> RouterResult<()> {
        let _guard = self.mutation_lock.lock().await;
        let txn = self.storage.begin_write()?;
        self.storage.clear(&txn)?;
        txn.commit().map_err(super::storage::StorageError::from)?;

        self.cache.clear().await;
        Ok(())
    }

    /// Resolve destination assignments for one item (exclusive tiers)
    pub async fn resolve(&self, menu_item_id: &str, category_id: &str) -> Vec<Assignment> {
        self.cache.resolve(menu_item_id, category_id).await
    }

    pub async fn stats(&self) -> AssignmentStats {
        self.cache.stats().await
    }

    /// Active count as seen by the cache
    pub async fn cached_active_count(&self) -> usize {
        self.cache.active_count().await
    }

    /// Active count as persisted; storage reads may lag out-of-process
    /// writes, which is exactly the drift the reconciler looks for
    pub fn persisted_active_count(&self) -> RouterResult<usize> {
        Ok(self.storage.active_count()?)
    }

    /// Reload the cache from the persisted store, rebuilding indices.
    /// Serialized with mutations so a reload cannot interleave between
    /// a commit and its cache update.
    pub async fn reload_from_storage(&self) -> RouterResult<usize> {
        let _guard = self.mutation_lock.lock().await;
        let assignments = self.storage.all()?;
        let count = assignments.iter().filter(|a| a.is_active).count();
        self.cache.reload(assignments).await;
        Ok(count)
    }
}

impl std::fmt::Debug for AssignmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentService")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}
