//! Storage trait definitions

use async_trait::async_trait;

pub use crate::error::StorageResult;
use crate::storage::row::TableRow;

/// Combined storage trait
pub trait Storage: TableStorage + BlobStorage + Send + Sync {}

/// Partitioned table store
#[async_trait]
pub trait TableStorage: Send + Sync {
    /// Create a table unless it already exists
    async fn create_table_if_missing(&self, table: &str) -> StorageResult<()>;

    /// Check whether a table exists
    async fn table_exists(&self, table: &str) -> StorageResult<bool>;

    /// Point lookup by partition and row key
    async fn get_entity(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StorageResult<Option<TableRow>>;

    /// All rows of one partition
    async fn get_entities(&self, table: &str, partition_key: &str) -> StorageResult<Vec<TableRow>>;

    /// Insert or replace every row in one call
    async fn batch_upsert(&self, table: &str, rows: Vec<TableRow>) -> StorageResult<()>;

    /// Delete every row in one call
    async fn batch_delete(&self, table: &str, rows: Vec<TableRow>) -> StorageResult<()>;
}

/// Named text blob writer
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write `text` to `path` inside `container`, replacing any previous content
    async fn write_text(&self, container: &str, path: &str, text: String) -> StorageResult<()>;
}
