//! Warden Types - Core value types for scale set reconciliation
//!
//! Warden keeps a durable record of every virtual machine scale set instance
//! it monitors and converges that record against live inventory and
//! externally reported health. This crate holds the pure, I/O-free part of
//! that model.
//!
//! ## Key Concepts
//!
//! - **ResourceId**: Hierarchical resource path split into positional segments
//! - **Host names**: Bijective mapping between instance ordinals and the
//!   fixed-width base-36 suffix of a scale set host name
//! - **HierarchicalIndex**: O(1) lookup of entities by
//!   (subscription, group, name, tag)
//! - **StateEntity / StatusEntity**: Persisted lifecycle and health records
//! - **TargetRegistry**: Health and load-balancer policy tables

#![deny(unsafe_code)]

pub mod entity;
pub mod error;
pub mod hostname;
pub mod index;
pub mod resource;
pub mod target;

// Re-export main types
pub use entity::{generate_row_key, StateEntity, StatusEntity};
pub use error::{HostNameError, ResourceIdError, TargetError};
pub use hostname::{host_name_to_instance_id, instance_to_host_name, HOST_NAME_SUFFIX_LEN};
pub use index::{HierarchicalIndex, IndexKey, Indexed, ScaleSetKey};
pub use resource::ResourceId;
pub use target::{
    BackendTarget, BalancerTarget, StatusTarget, TargetRegistry, BACKEND_TARGETS_VAR,
    STATUS_TARGETS_VAR,
};
