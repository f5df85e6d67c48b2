//! State sync: recorded lifecycle state against live inventory.

use chrono::Utc;
use tracing::{info, instrument, warn};
use warden_types::{HierarchicalIndex, ResourceId, ScaleSetKey, StateEntity};

use super::policy::DeletionReason;
use super::Reconciler;
use crate::compute::{ComputeProvider, ScaleSetInstance};
use crate::error::{ReconcileError, Result};
use crate::storage::Storage;

impl<S: Storage, C: ComputeProvider> Reconciler<S, C> {
    /// Converge the State table against live inventory for every monitored
    /// scale set.
    #[instrument(skip(self))]
    pub async fn state(&self) -> Result<()> {
        if !self.ensure_ready("state").await? {
            return Ok(());
        }

        self.clean_states().await?;

        let kind = &self.config.policy.scale_set_kind;
        for target in self.targets.status_targets() {
            if !target.kind.eq_ignore_ascii_case(kind) {
                continue;
            }
            for id in &target.resources {
                self.sync_scale_set_state(id).await?;
            }
        }

        Ok(())
    }

    /// Delete State rows no health target covers anymore.
    async fn clean_states(&self) -> Result<()> {
        let stale: Vec<StateEntity> = self
            .data
            .read_states()
            .await?
            .into_iter()
            .filter(|s| self.targets.status_target_for(&s.id).is_none())
            .collect();

        if !stale.is_empty() {
            info!(count = stale.len(), "Removing untracked states");
            self.data.delete_states(&stale).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn sync_scale_set_state(&self, id: &str) -> Result<()> {
        let resource = ResourceId::parse(id.to_lowercase())?;
        let scale_set = ScaleSetKey::from_resource(&resource);
        let group = resource.resource_group();
        let name = resource.name();

        let (states, live) = tokio::try_join!(self.data.read_states(), async {
            Ok::<_, ReconcileError>(self.compute.list_instances(group, name).await?)
        })?;

        let persisted = HierarchicalIndex::build(states)?;
        let mut inventory: HierarchicalIndex<ScaleSetInstance> = HierarchicalIndex::new();
        for instance in live {
            inventory.insert(scale_set.with_tag(&instance.instance_id), instance);
        }

        let now = Utc::now();
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        let mut failed = Vec::new();

        for (key, state) in persisted.scale_set_entries(&scale_set) {
            match inventory.get(key) {
                None => deletes.push(state.clone()),
                Some(instance) if instance.provisioning_state != state.state => {
                    let mut updated = state.clone();
                    updated.state = instance.provisioning_state.clone();
                    updates.push(updated);

                    if instance.provisioning_state == self.config.policy.failure_value {
                        failed.push(instance.instance_id.clone());
                    }
                }
                Some(_) => {}
            }
        }

        for (key, instance) in inventory.iter() {
            if !persisted.contains(key) {
                creates.push(StateEntity::new(
                    resource.as_str(),
                    &self.config.policy.scale_set_kind,
                    &instance.instance_id,
                    now,
                    &instance.provisioning_state,
                ));
            }
        }

        info!(
            resource_id = %resource,
            created = creates.len(),
            updated = updates.len(),
            deleted = deletes.len(),
            "State sync"
        );

        tokio::try_join!(
            self.data.upsert_states(&creates),
            self.data.upsert_states(&updates),
            self.data.delete_states(&deletes),
        )?;

        if !failed.is_empty() {
            failed.sort();
            warn!(
                resource_id = %resource,
                instance_ids = ?failed,
                reason = %DeletionReason::ProvisioningFailed,
                "Deleting instances"
            );
            self.compute.delete_instances(group, name, &failed).await?;
        }

        Ok(())
    }
}
