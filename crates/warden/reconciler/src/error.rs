//! Error types for warden-reconciler

use thiserror::Error;
use warden_types::{HostNameError, ResourceIdError};

/// Reconciler-level errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Compute provider error
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Malformed resource id
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceIdError),

    /// Undecodable host name
    #[error("Host name error: {0}")]
    HostName(#[from] HostNameError),

    /// Status event missing required fields
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Table or entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row could not be decoded into an entity
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// Compute provider errors
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Scale set not found
    #[error("Scale set not found: {0}")]
    NotFound(String),

    /// Provider request failed
    #[error("Request failed: {0}")]
    Request(String),
}

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type for compute operations
pub type ComputeResult<T> = std::result::Result<T, ComputeError>;
