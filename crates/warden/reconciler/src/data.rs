//! Data model over the table store.
//!
//! Typed reads and writes of State, Status and readiness rows. Batches are
//! split into pages of `batch_size` rows and the pages are issued
//! concurrently; a failing page does not roll back pages already committed.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};
use warden_types::{generate_row_key, StateEntity, StatusEntity};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::{RowCodec, Storage, TableRow};

const READY_VALUE: &str = "Succeeded";
const VALUE_PROPERTY: &str = "Value";

/// Typed access to the State, Status and Configuration tables.
pub struct DataModel<S> {
    storage: Arc<S>,
    config: StorageConfig,
}

impl<S: Storage> DataModel<S> {
    pub fn new(storage: Arc<S>, config: StorageConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Create the tables unless `flag` says that already happened.
    #[instrument(skip(self))]
    pub async fn initialize(&self, flag: &str) -> Result<()> {
        if self.is_ready_state(flag).await? {
            return Ok(());
        }

        debug!("Creating tables");
        self.storage
            .create_table_if_missing(&self.config.configuration_table)
            .await?;
        self.storage
            .create_table_if_missing(&self.config.state_table)
            .await?;
        self.storage
            .create_table_if_missing(&self.config.status_table)
            .await?;

        self.mark_ready_state(flag).await
    }

    /// Whether the readiness flag `name` is set.
    pub async fn is_ready_state(&self, name: &str) -> Result<bool> {
        let table = &self.config.configuration_table;
        if !self.storage.table_exists(table).await? {
            return Ok(false);
        }

        let row = self
            .storage
            .get_entity(table, &self.config.configuration_partition, name)
            .await?;

        Ok(row.is_some_and(|r| r.string(VALUE_PROPERTY).is_ok_and(|v| v == READY_VALUE)))
    }

    pub async fn mark_ready_state(&self, name: &str) -> Result<()> {
        let row = TableRow::new(&self.config.configuration_partition, name)
            .with_string(VALUE_PROPERTY, READY_VALUE);
        self.storage
            .batch_upsert(&self.config.configuration_table, vec![row])
            .await?;
        Ok(())
    }

    pub async fn read_states(&self) -> Result<Vec<StateEntity>> {
        self.read_all(&self.config.state_table, &self.config.state_partition)
            .await
    }

    pub async fn read_statuses(&self) -> Result<Vec<StatusEntity>> {
        self.read_all(&self.config.status_table, &self.config.status_partition)
            .await
    }

    /// Read State and Status concurrently.
    pub async fn read_states_and_statuses(&self) -> Result<(Vec<StateEntity>, Vec<StatusEntity>)> {
        tokio::try_join!(self.read_states(), self.read_statuses())
    }

    pub async fn read_status(
        &self,
        id: &str,
        kind: &str,
        tag: &str,
    ) -> Result<Option<StatusEntity>> {
        let row = self
            .storage
            .get_entity(
                &self.config.status_table,
                &self.config.status_partition,
                &generate_row_key(id, kind, tag),
            )
            .await?;

        Ok(row.map(|r| StatusEntity::from_row(&r)).transpose()?)
    }

    pub async fn upsert_status(&self, status: &StatusEntity) -> Result<()> {
        self.upsert_statuses(std::slice::from_ref(status)).await
    }

    /// Insert or replace State rows.
    pub async fn upsert_states(&self, states: &[StateEntity]) -> Result<()> {
        let rows = to_rows(states, &self.config.state_partition);
        self.batch(&self.config.state_table, rows, false).await
    }

    pub async fn delete_states(&self, states: &[StateEntity]) -> Result<()> {
        let rows = to_rows(states, &self.config.state_partition);
        self.batch(&self.config.state_table, rows, true).await
    }

    pub async fn upsert_statuses(&self, statuses: &[StatusEntity]) -> Result<()> {
        let rows = to_rows(statuses, &self.config.status_partition);
        self.batch(&self.config.status_table, rows, false).await
    }

    pub async fn delete_statuses(&self, statuses: &[StatusEntity]) -> Result<()> {
        let rows = to_rows(statuses, &self.config.status_partition);
        self.batch(&self.config.status_table, rows, true).await
    }

    /// Write a backend configuration blob.
    pub async fn write_text(&self, container: &str, path: &str, text: String) -> Result<()> {
        self.storage.write_text(container, path, text).await?;
        Ok(())
    }

    async fn read_all<T: RowCodec>(&self, table: &str, partition_key: &str) -> Result<Vec<T>> {
        let rows = self.storage.get_entities(table, partition_key).await?;
        let entities = rows
            .iter()
            .map(T::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn batch(&self, table: &str, rows: Vec<TableRow>, delete: bool) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let pages = rows
            .chunks(self.config.batch_size.max(1))
            .map(move |page| {
                let page = page.to_vec();
                async move {
                    if delete {
                        self.storage.batch_delete(table, page).await
                    } else {
                        self.storage.batch_upsert(table, page).await
                    }
                }
            });

        try_join_all(pages).await?;
        Ok(())
    }
}

fn to_rows<T: RowCodec>(entities: &[T], partition_key: &str) -> Vec<TableRow> {
    entities.iter().map(|e| e.to_row(partition_key)).collect()
}
