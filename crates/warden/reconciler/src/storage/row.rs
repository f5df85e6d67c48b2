//! Table rows and the entity codec at the storage boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use warden_types::{StateEntity, StatusEntity};

use crate::error::StorageError;
use crate::storage::traits::StorageResult;

/// A typed table property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    String(String),
    DateTime(DateTime<Utc>),
}

/// One row of a partitioned table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub partition_key: String,
    pub row_key: String,
    pub properties: BTreeMap<String, Property>,
}

impl TableRow {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties
            .insert(name.to_string(), Property::String(value.into()));
        self
    }

    pub fn with_datetime(mut self, name: &str, value: DateTime<Utc>) -> Self {
        self.properties
            .insert(name.to_string(), Property::DateTime(value));
        self
    }

    pub fn string(&self, name: &str) -> StorageResult<&str> {
        match self.properties.get(name) {
            Some(Property::String(value)) => Ok(value),
            Some(_) => Err(self.invalid(name, "expected string")),
            None => Err(self.invalid(name, "missing")),
        }
    }

    pub fn datetime(&self, name: &str) -> StorageResult<DateTime<Utc>> {
        match self.properties.get(name) {
            Some(Property::DateTime(value)) => Ok(*value),
            Some(_) => Err(self.invalid(name, "expected datetime")),
            None => Err(self.invalid(name, "missing")),
        }
    }

    fn invalid(&self, name: &str, problem: &str) -> StorageError {
        StorageError::InvalidData(format!(
            "row {}/{}: property {} {}",
            self.partition_key, self.row_key, name, problem
        ))
    }
}

/// Explicit encode/decode pair between a typed record and a table row.
pub trait RowCodec: Sized {
    fn to_row(&self, partition_key: &str) -> TableRow;
    fn from_row(row: &TableRow) -> StorageResult<Self>;
}

impl RowCodec for StateEntity {
    fn to_row(&self, partition_key: &str) -> TableRow {
        TableRow::new(partition_key, self.row_key())
            .with_string("Id", &self.id)
            .with_string("Type", &self.kind)
            .with_string("Tag", &self.tag)
            .with_datetime("CreatedWhen", self.created_when)
            .with_string("State", &self.state)
    }

    fn from_row(row: &TableRow) -> StorageResult<Self> {
        Ok(StateEntity::new(
            row.string("Id")?,
            row.string("Type")?,
            row.string("Tag")?,
            row.datetime("CreatedWhen")?,
            row.string("State")?,
        ))
    }
}

impl RowCodec for StatusEntity {
    fn to_row(&self, partition_key: &str) -> TableRow {
        TableRow::new(partition_key, self.row_key())
            .with_string("Id", &self.id)
            .with_string("Type", &self.kind)
            .with_string("Tag", &self.tag)
            .with_datetime("ChangedWhen", self.changed_when)
            .with_string("Status", &self.status)
            .with_datetime("Timestamp", self.timestamp)
    }

    fn from_row(row: &TableRow) -> StorageResult<Self> {
        Ok(StatusEntity::new(
            row.string("Id")?,
            row.string("Type")?,
            row.string("Tag")?,
            row.datetime("ChangedWhen")?,
            row.string("Status")?,
            row.datetime("Timestamp")?,
        ))
    }
}
