//! Error types for warden-types.

use thiserror::Error;

/// Errors raised while constructing a [`crate::ResourceId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceIdError {
    /// The resource path was empty.
    #[error("resource path cannot be empty")]
    Empty,
}

/// Errors raised while decoding a scale set host name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostNameError {
    /// The host name was empty.
    #[error("host name cannot be empty")]
    Empty,

    /// The host name suffix contains a character outside `[0-9A-Za-z]`.
    #[error("invalid base-36 digit {digit:?} in host name {host_name}")]
    InvalidDigit { host_name: String, digit: char },
}

/// Errors raised while parsing target policy tables.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The serialized target list is not valid JSON of the expected shape.
    #[error("malformed {table} targets: {source}")]
    Malformed {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
