//! Warden Reconciler - Scale set state, health and backend reconciliation
//!
//! The reconciler keeps a durable record of every monitored scale set
//! instance and converges it against two external sources:
//!
//! - live inventory from a [`ComputeProvider`]
//! - health reports delivered as [`StatusEvent`]s
//!
//! Instances that fail to provision, stay unhealthy, or fall silent past
//! their target's expiration are deleted from the provider. The converged
//! record also drives a per-frontend load-balancer backend list.
//!
//! Persistence goes through the [`Storage`] seam; [`InMemoryStorage`] and
//! [`InMemoryCompute`] back development and tests.

#![deny(unsafe_code)]

pub mod compute;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod storage;
pub mod telemetry;

pub use compute::{ComputeProvider, InMemoryCompute, NetworkInterface, ScaleSetInstance};
pub use config::ReconcilerConfig;
pub use data::DataModel;
pub use engine::{Reconciler, StatusEvent, StatusEventData};
pub use error::{ComputeError, ReconcileError, Result, StorageError};
pub use storage::{InMemoryStorage, Storage};
