//! Category / menu-item catalog boundary
//!
//! Assignment rules reference catalog rows by id. When an admin adds a
//! rule for a target that does not exist yet, the store auto-creates a
//! placeholder row instead of failing on a dangling reference.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::AssignmentType;

/// Existence check + placeholder creation for assignment targets
#[async_trait]
pub trait TargetCatalog: Send + Sync {
    async fn exists(&self, kind: AssignmentType, target_id: &str) -> bool;

    /// Create a minimal row so a referencing assignment stays valid.
    /// Idempotent: creating an existing target is a no-op.
    async fn create_placeholder(&self, kind: AssignmentType, target_id: &str, name: &str);
}

/// In-memory target catalog
#[derive(Debug, Default)]
pub struct MemoryTargetCatalog {
    categories: RwLock<HashMap<String, String>>,
    menu_items: RwLock<HashMap<String, String>>,
}

impl MemoryTargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a target as already existing
    pub async fn seed(&self, kind: AssignmentType, target_id: &str, name: &str) {
        self.table(kind)
            .write()
            .await
            .insert(target_id.to_string(), name.to_string());
    }

    /// Number of known targets of the given kind
    pub async fn len(&self, kind: AssignmentType) -> usize {
        self.table(kind).read().await.len()
    }

    fn table(&self, kind: AssignmentType) -> &RwLock<HashMap<String, String>> {
        match kind {
            AssignmentType::Category => &self.categories,
            AssignmentType::MenuItem => &self.menu_items,
        }
    }
}

#[async_trait]
impl TargetCatalog for MemoryTargetCatalog {
    async fn exists(&self, kind: AssignmentType, target_id: &str) -> bool {
        self.table(kind).read().await.contains_key(target_id)
    }

    async fn create_placeholder(&self, kind: AssignmentType, target_id: &str, name: &str) {
        let mut table = self.table(kind).write().await;
        table
            .entry(target_id.to_string())
            .or_insert_with(|| name.to_string());
    }
}
