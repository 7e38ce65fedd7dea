//! redb-based storage for assignment rules
//!
//! Rows are keyed by a monotonic insertion sequence so that a full
//! reload preserves original insertion order (priority ties resolve by
//! insertion order). A secondary id table and a
//! `(target_id, assignment_type)` index support point lookups.

use crate::types::{Assignment, AssignmentType};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Assignments table: key = insertion sequence, value = JSON
const ASSIGNMENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("assignments");

/// Id lookup: assignment_id -> insertion sequence
const ASSIGNMENT_IDS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("assignment_ids");

/// Index: (target_id, assignment_type, seq) -> ()
const ASSIGNMENTS_BY_TARGET_TABLE: TableDefinition<(&str, &str, u64), ()> =
    TableDefinition::new("assignments_by_target");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Assignment rule storage
#[derive(Clone)]
pub struct AssignmentStorage {
    db: Arc<Database>,
}

impl AssignmentStorage {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (tests and ephemeral deployments)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ASSIGNMENTS_TABLE)?;
            let _ = write_txn.open_table(ASSIGNMENT_IDS_TABLE)?;
            let _ = write_txn.open_table(ASSIGNMENTS_BY_TARGET_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Insert a new assignment, assigning the next sequence number
    pub fn insert(&self, txn: &WriteTransaction, assignment: &Assignment) -> StorageResult<()> {
        let mut table = txn.open_table(ASSIGNMENTS_TABLE)?;
        let seq = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);

        let value = serde_json::to_vec(assignment)?;
        table.insert(seq, value.as_slice())?;

        let mut id_table = txn.open_table(ASSIGNMENT_IDS_TABLE)?;
        id_table.insert(assignment.id.as_str(), seq)?;

        let mut idx_table = txn.open_table(ASSIGNMENTS_BY_TARGET_TABLE)?;
        idx_table.insert(
            (
                assignment.target_id.as_str(),
                assignment.assignment_type.as_str(),
                seq,
            ),
            (),
        )?;

        Ok(())
    }

    /// Is an active assignment persisted for this exact tuple?
    ///
    /// Runs inside the caller's write transaction so an insert guarded
    /// by this check cannot race another writer.
    pub fn has_active_tuple(
        &self,
        txn: &WriteTransaction,
        printer_id: &str,
        target_id: &str,
        assignment_type: AssignmentType,
    ) -> StorageResult<bool> {
        let idx_table = txn.open_table(ASSIGNMENTS_BY_TARGET_TABLE)?;
        let table = txn.open_table(ASSIGNMENTS_TABLE)?;

        let ty = assignment_type.as_str();
        for entry in idx_table.range((target_id, ty, 0)..=(target_id, ty, u64::MAX))? {
            let (key, _) = entry?;
            let seq = key.value().2;
            if let Some(value) = table.get(seq)? {
                let assignment: Assignment = serde_json::from_slice(value.value())?;
                if assignment.is_active && assignment.printer_id == printer_id {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Get an assignment by id
    pub fn get(&self, id: &str) -> StorageResult<Option<Assignment>> {
        let read_txn = self.db.begin_read()?;
        let id_table = read_txn.open_table(ASSIGNMENT_IDS_TABLE)?;

        let Some(seq) = id_table.get(id)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let table = read_txn.open_table(ASSIGNMENTS_TABLE)?;
        match table.get(seq)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Flip an assignment's active flag (soft remove keeps the row).
    /// Returns false if the id is unknown.
    pub fn set_active(
        &self,
        txn: &WriteTransaction,
        id: &str,
        active: bool,
        updated_at: i64,
    ) -> StorageResult<bool> {
        let seq = {
            let id_table = txn.open_table(ASSIGNMENT_IDS_TABLE)?;
            match id_table.get(id)? {
                Some(v) => v.value(),
                None => return Ok(false),
            }
        };

        let mut table = txn.open_table(ASSIGNMENTS_TABLE)?;
        let mut assignment: Assignment = match table.get(seq)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(false),
        };

        assignment.is_active = active;
        assignment.updated_at = updated_at;

        let value = serde_json::to_vec(&assignment)?;
        table.insert(seq, value.as_slice())?;

        Ok(true)
    }

    /// All assignments (active and inactive) in insertion order
    pub fn all(&self) -> StorageResult<Vec<Assignment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASSIGNMENTS_TABLE)?;

        let mut result = Vec::with_capacity(table.len()? as usize);
        for entry in table.iter()? {
            let (_, value) = entry?;
            result.push(serde_json::from_slice(value.value())?);
        }

        Ok(result)
    }

    /// Number of active assignments in the persisted store
    pub fn active_count(&self) -> StorageResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASSIGNMENTS_TABLE)?;

        let mut count = 0;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let assignment: Assignment = serde_json::from_slice(value.value())?;
            if assignment.is_active {
                count += 1;
            }
        }

        Ok(count)
    }

    /// Drop every assignment row
    pub fn clear(&self, txn: &WriteTransaction) -> StorageResult<()> {
        let mut table = txn.open_table(ASSIGNMENTS_TABLE)?;
        table.retain(|_, _| false)?;

        let mut id_table = txn.open_table(ASSIGNMENT_IDS_TABLE)?;
        id_table.retain(|_, _| false)?;

        let mut idx_table = txn.open_table(ASSIGNMENTS_BY_TARGET_TABLE)?;
        idx_table.retain(|_, _| false)?;

        Ok(())
    }
}

impl std::fmt::Debug for AssignmentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentStorage").finish_non_exhaustive()
    }
}
