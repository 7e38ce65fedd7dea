//! In-memory assignment cache with resolution indices
//!
//! Holds every assignment in insertion order plus the two lookup
//! indices (`category_id -> rows`, `menu_item_id -> rows`) that
//! `resolve` reads. All mutators go through the write lock, so cache
//! updates and index rebuilds are serialized against reads.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{Assignment, AssignmentStats, AssignmentType};

#[derive(Debug, Clone, Default)]
pub struct AssignmentCache {
    inner: Arc<RwLock<CacheInner>>,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// Insertion order; rows are never removed, only deactivated
    assignments: Vec<Assignment>,
    by_category: HashMap<String, Vec<usize>>,
    by_menu_item: HashMap<String, Vec<usize>>,
}

impl CacheInner {
    fn index(&mut self, pos: usize) {
        let assignment = &self.assignments[pos];
        let index = match assignment.assignment_type {
            AssignmentType::Category => &mut self.by_category,
            AssignmentType::MenuItem => &mut self.by_menu_item,
        };
        index
            .entry(assignment.target_id.clone())
            .or_default()
            .push(pos);
    }

    fn collect_active(&self, positions: Option<&Vec<usize>>) -> Vec<Assignment> {
        positions
            .map(|ps| {
                ps.iter()
                    .filter_map(|&p| self.assignments.get(p))
                    .filter(|a| a.is_active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl AssignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an assignment and index it
    pub async fn insert(&self, assignment: Assignment) {
        let mut inner = self.inner.write().await;
        inner.assignments.push(assignment);
        let pos = inner.assignments.len() - 1;
        inner.index(pos);
    }

    /// Deactivate by id; returns false if the id is unknown
    pub async fn deactivate(&self, id: &str, updated_at: i64) -> bool {
        let mut inner = self.inner.write().await;
        match inner.assignments.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.is_active = false;
                a.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    /// Replace the whole cache and rebuild both indices from scratch.
    /// O(number of assignments); used by the reconciler on drift.
    pub async fn reload(&self, assignments: Vec<Assignment>) {
        let mut inner = self.inner.write().await;
        inner.assignments = assignments;
        inner.by_category = HashMap::new();
        inner.by_menu_item = HashMap::new();
        for pos in 0..inner.assignments.len() {
            inner.index(pos);
        }
    }

    pub async fn clear(&self) {
        self.reload(Vec::new()).await;
    }

    /// Every cached assignment, insertion order, inactive included
    pub async fn all(&self) -> Vec<Assignment> {
        self.inner.read().await.assignments.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.inner
            .read()
            .await
            .assignments
            .iter()
            .filter(|a| a.is_active)
            .count()
    }

    /// Is there an active assignment for this exact tuple?
    pub async fn has_active(
        &self,
        printer_id: &str,
        target_id: &str,
        assignment_type: AssignmentType,
    ) -> bool {
        self.inner.read().await.assignments.iter().any(|a| {
            a.is_active
                && a.printer_id == printer_id
                && a.target_id == target_id
                && a.assignment_type == assignment_type
        })
    }

    /// Resolve the destination assignments for one order item.
    ///
    /// Exclusive tiers: any active menu-item rule for `menu_item_id`
    /// makes the menu-item tier the entire result; category rules are
    /// consulted only when that tier is empty. The chosen tier is
    /// sorted by priority descending, ties keeping insertion order.
    /// An empty result means the caller applies the fallback printer.
    pub async fn resolve(&self, menu_item_id: &str, category_id: &str) -> Vec<Assignment> {
        let inner = self.inner.read().await;

        let mut chosen = inner.collect_active(inner.by_menu_item.get(menu_item_id));
        if chosen.is_empty() {
            chosen = inner.collect_active(inner.by_category.get(category_id));
        }

        // Stable sort keeps insertion order among equal priorities
        chosen.sort_by(|a, b| b.priority.cmp(&a.priority));
        chosen
    }

    pub async fn stats(&self) -> AssignmentStats {
        let inner = self.inner.read().await;

        let mut category = 0;
        let mut menu_item = 0;
        let mut printers: HashSet<&str> = HashSet::new();

        for a in inner.assignments.iter().filter(|a| a.is_active) {
            match a.assignment_type {
                AssignmentType::Category => category += 1,
                AssignmentType::MenuItem => menu_item += 1,
            }
            printers.insert(a.printer_id.as_str());
        }

        AssignmentStats {
            total_assignments: category + menu_item,
            category_assignments: category,
            menu_item_assignments: menu_item,
            active_printers: printers.len(),
        }
    }
}
