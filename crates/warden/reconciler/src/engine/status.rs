//! Status sync: recorded health against deletion policy.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, info, instrument, warn};
use warden_types::{HierarchicalIndex, IndexKey, ResourceId, StatusEntity};

use super::policy::{evaluate, Decision, DeletionReason};
use super::Reconciler;
use crate::compute::ComputeProvider;
use crate::error::{ReconcileError, Result};
use crate::storage::Storage;

/// A status row selected for deletion.
#[derive(Debug, Clone)]
struct Deletion {
    status: StatusEntity,
    ordinal: u64,
    reason: DeletionReason,
}

impl<S: Storage, C: ComputeProvider> Reconciler<S, C> {
    /// Judge every known instance against its health target and delete the
    /// unrecoverable ones.
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<()> {
        if !self.ensure_ready("status").await? {
            return Ok(());
        }

        self.clean_statuses().await?;
        self.check_status().await
    }

    /// Delete Status rows no health target covers anymore.
    async fn clean_statuses(&self) -> Result<()> {
        let stale: Vec<StatusEntity> = self
            .data
            .read_statuses()
            .await?
            .into_iter()
            .filter(|s| self.targets.status_target_for(&s.id).is_none())
            .collect();

        if !stale.is_empty() {
            info!(count = stale.len(), "Removing untracked statuses");
            self.data.delete_statuses(&stale).await?;
        }
        Ok(())
    }

    async fn check_status(&self) -> Result<()> {
        let (states, statuses) = self.data.read_states_and_statuses().await?;

        let state_index = HierarchicalIndex::build(states)?;

        // Status tags are host names; key them by the ordinal they encode so
        // they line up with State tags. A tag that does not decode can never
        // match a State and is removed with the orphans.
        let mut undecodable: Vec<StatusEntity> = Vec::new();
        let key_of = |status: &StatusEntity| -> Result<Option<IndexKey>> {
            let resource = ResourceId::parse(status.id.as_str())?;
            match status.instance_ordinal() {
                Ok(ordinal) => Ok(Some(IndexKey::new(&resource, &ordinal.to_string()))),
                Err(e) => {
                    debug!(
                        resource_id = %resource,
                        tag = %status.tag,
                        error = %e,
                        "Undecodable status tag"
                    );
                    undecodable.push(status.clone());
                    Ok(None)
                }
            }
        };
        let status_index = HierarchicalIndex::build_by(statuses, key_of)?;

        let orphans: Vec<StatusEntity> = status_index
            .iter()
            .filter(|(key, _)| !state_index.contains(key))
            .map(|(_, status)| status.clone())
            .chain(undecodable)
            .collect();

        let now = Utc::now();
        let mut pending: BTreeMap<String, Vec<Deletion>> = BTreeMap::new();

        for (key, state) in state_index.iter() {
            let Some(status) = status_index.get(key) else {
                continue;
            };
            let Some(target) = self.targets.status_target_for(&state.id) else {
                continue;
            };

            match evaluate(state, status, target, &self.config.policy, now) {
                Decision::Delete(reason) => {
                    let ordinal = status.instance_ordinal()?;
                    pending
                        .entry(state.id.to_lowercase())
                        .or_default()
                        .push(Deletion {
                            status: status.clone(),
                            ordinal,
                            reason,
                        });
                }
                Decision::Defer => {
                    debug!(resource_id = %state.id, tag = %state.tag, "Within grace period");
                }
                Decision::Keep => {}
            }
        }

        if !orphans.is_empty() {
            info!(count = orphans.len(), "Removing statuses without state");
            self.data.delete_statuses(&orphans).await?;
        }

        try_join_all(
            pending
                .into_iter()
                .map(|(id, deletions)| self.delete_unrecoverable(id, deletions)),
        )
        .await?;

        Ok(())
    }

    /// Remove the status rows and the underlying instances of one scale set.
    async fn delete_unrecoverable(&self, id: String, deletions: Vec<Deletion>) -> Result<()> {
        let resource = ResourceId::parse(id)?;

        let mut instance_ids: Vec<String> =
            deletions.iter().map(|d| d.ordinal.to_string()).collect();
        instance_ids.sort();
        let reasons: Vec<String> = deletions.iter().map(|d| d.reason.to_string()).collect();
        let statuses: Vec<StatusEntity> = deletions.into_iter().map(|d| d.status).collect();

        warn!(
            resource_id = %resource,
            instance_ids = ?instance_ids,
            reasons = ?reasons,
            "Deleting instances"
        );

        tokio::try_join!(self.data.delete_statuses(&statuses), async {
            Ok::<_, ReconcileError>(
                self.compute
                    .delete_instances(resource.resource_group(), resource.name(), &instance_ids)
                    .await?,
            )
        })?;

        Ok(())
    }
}
