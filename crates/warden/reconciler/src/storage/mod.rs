//! Storage layer for warden-reconciler
//!
//! Abstracts the partitioned table store and the blob writer the engine
//! persists to.

mod memory;
mod row;
mod traits;

pub use memory::{BatchOperation, BatchRecord, InMemoryStorage};
pub use row::{Property, RowCodec, TableRow};
pub use traits::{BlobStorage, Storage, StorageResult, TableStorage};
