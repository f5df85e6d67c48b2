//! In-memory storage implementation

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::row::TableRow;
use super::traits::*;
use crate::error::StorageError;

type Table = BTreeMap<(String, String), TableRow>;

/// Kind of a recorded batch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Upsert,
    Delete,
}

/// One batch call as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub table: String,
    pub operation: BatchOperation,
    pub row_keys: Vec<String>,
}

/// In-memory storage for development and testing
///
/// Every batch call is recorded so callers can assert on paging and on the
/// exact set of rows written or removed.
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    blobs: Arc<RwLock<BTreeMap<(String, String), String>>>,
    batches: Arc<RwLock<Vec<BatchRecord>>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            blobs: Arc::new(RwLock::new(BTreeMap::new())),
            batches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Batch calls issued so far, in order
    pub async fn batches(&self) -> Vec<BatchRecord> {
        self.batches.read().await.clone()
    }

    /// Forget recorded batch calls
    pub async fn clear_batches(&self) {
        self.batches.write().await.clear();
    }

    /// Content of a written blob
    pub async fn blob(&self, container: &str, path: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(&(container.to_string(), path.to_string()))
            .cloned()
    }

    /// Paths written inside a container
    pub async fn blob_paths(&self, container: &str) -> Vec<String> {
        self.blobs
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, path)| path.clone())
            .collect()
    }

    async fn record(&self, table: &str, operation: BatchOperation, rows: &[TableRow]) {
        self.batches.write().await.push(BatchRecord {
            table: table.to_string(),
            operation,
            row_keys: rows.iter().map(|r| r.row_key.clone()).collect(),
        });
    }
}

fn missing_table(table: &str) -> StorageError {
    StorageError::NotFound(format!("table {table}"))
}

#[async_trait]
impl TableStorage for InMemoryStorage {
    async fn create_table_if_missing(&self, table: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.contains_key(table))
    }

    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StorageResult<Option<TableRow>> {
        let tables = self.tables.read().await;
        let rows = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned())
    }

    async fn get_entities(&self, table: &str, partition_key: &str) -> StorageResult<Vec<TableRow>> {
        let tables = self.tables.read().await;
        let rows = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows
            .values()
            .filter(|r| r.partition_key == partition_key)
            .cloned()
            .collect())
    }

    async fn batch_upsert(&self, table: &str, rows: Vec<TableRow>) -> StorageResult<()> {
        {
            let mut tables = self.tables.write().await;
            let stored = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
            for row in &rows {
                stored.insert((row.partition_key.clone(), row.row_key.clone()), row.clone());
            }
        }
        self.record(table, BatchOperation::Upsert, &rows).await;
        Ok(())
    }

    async fn batch_delete(&self, table: &str, rows: Vec<TableRow>) -> StorageResult<()> {
        {
            let mut tables = self.tables.write().await;
            let stored = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
            for row in &rows {
                stored.remove(&(row.partition_key.clone(), row.row_key.clone()));
            }
        }
        self.record(table, BatchOperation::Delete, &rows).await;
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for InMemoryStorage {
    async fn write_text(&self, container: &str, path: &str, text: String) -> StorageResult<()> {
        let mut blobs = self.blobs.write().await;
        blobs.insert((container.to_string(), path.to_string()), text);
        Ok(())
    }
}

impl Storage for InMemoryStorage {}
