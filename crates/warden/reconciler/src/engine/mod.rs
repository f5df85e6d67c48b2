//! Reconciliation engine.
//!
//! One cycle runs three steps in order:
//!
//! 1. **State sync**: converge the State table against live inventory and
//!    force-delete instances whose provisioning failed.
//! 2. **Status sync**: judge every known instance against its health target
//!    and delete the ones that are unrecoverable.
//! 3. **Backend derivation**: write one backend list per load-balancer
//!    frontend from the converged State table.
//!
//! Each step re-reads the store and recomputes its decisions from scratch,
//! so repeated cycles over unchanged inputs converge to the same store
//! contents. Every step is a no-op until the engine has been initialized.

mod backends;
mod events;
mod policy;
mod state;
mod status;

use std::sync::Arc;

use tracing::{debug, info, instrument};
use warden_types::TargetRegistry;

use crate::compute::ComputeProvider;
use crate::config::ReconcilerConfig;
use crate::data::DataModel;
use crate::error::Result;
use crate::storage::Storage;

pub use backends::backend_line;
pub use events::{StatusEvent, StatusEventData};
pub use policy::{evaluate, within_grace, Decision, DeletionReason};

/// Converges recorded instance state and health against live inventory.
pub struct Reconciler<S, C> {
    config: ReconcilerConfig,
    targets: TargetRegistry,
    data: DataModel<S>,
    compute: Arc<C>,
}

impl<S: Storage, C: ComputeProvider> Reconciler<S, C> {
    /// Create a new reconciler
    pub fn new(
        config: ReconcilerConfig,
        targets: TargetRegistry,
        storage: Arc<S>,
        compute: Arc<C>,
    ) -> Self {
        let data = DataModel::new(storage, config.storage.clone());
        Self {
            config,
            targets,
            data,
            compute,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn data(&self) -> &DataModel<S> {
        &self.data
    }

    /// Create the tables on first use and mark the engine ready.
    ///
    /// Safe to call on every start.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.data.initialize(&self.config.policy.data_ready_flag).await?;
        self.data
            .mark_ready_state(&self.config.policy.application_ready_flag)
            .await?;
        info!("Reconciler ready");
        Ok(())
    }

    pub async fn is_ready(&self) -> Result<bool> {
        self.data
            .is_ready_state(&self.config.policy.application_ready_flag)
            .await
    }

    /// Run state sync, status sync and backend derivation in that order.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<()> {
        self.state().await?;
        self.status().await?;
        self.backends().await
    }

    /// Readiness gate shared by every step.
    async fn ensure_ready(&self, step: &'static str) -> Result<bool> {
        let ready = self.is_ready().await?;
        if !ready {
            debug!(step, "Reconciler not ready, skipping");
        }
        Ok(ready)
    }
}
