//! Health report ingestion.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use warden_types::{ResourceId, StatusEntity};

use super::Reconciler;
use crate::compute::ComputeProvider;
use crate::error::{ReconcileError, Result};
use crate::storage::Storage;

/// A health report published for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub topic: String,

    /// Scale set resource id the instance belongs to
    pub subject: String,

    pub event_type: String,

    pub data: StatusEventData,
}

/// Payload of a [`StatusEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEventData {
    /// Resource kind
    #[serde(rename = "type")]
    pub kind: String,

    /// Host name the instance reports under
    pub name: String,

    /// Health label
    pub status: String,
}

impl<S: Storage, C: ComputeProvider> Reconciler<S, C> {
    /// Record a health report.
    ///
    /// Events from another topic, of another type, or for a resource no
    /// health target covers are ignored.
    #[instrument(skip(self, event), fields(subject = %event.subject, host = %event.data.name))]
    pub async fn event(&self, event: &StatusEvent) -> Result<()> {
        if !self.ensure_ready("event").await? {
            return Ok(());
        }

        if let Some(topic) = &self.config.events.topic_id {
            if !event.topic.eq_ignore_ascii_case(topic) {
                debug!(topic = %event.topic, "Ignoring event from other topic");
                return Ok(());
            }
        }

        if !event.event_type.eq_ignore_ascii_case(&self.config.events.event_type) {
            debug!(event_type = %event.event_type, "Ignoring event type");
            return Ok(());
        }

        if self.targets.status_target_for(&event.subject).is_none() {
            debug!("Ignoring event for untracked resource");
            return Ok(());
        }

        if event.data.name.is_empty() {
            return Err(ReconcileError::InvalidEvent(format!(
                "missing host name for {}",
                event.subject
            )));
        }
        let resource = ResourceId::parse(event.subject.as_str())?;

        self.update_status(
            resource.as_str(),
            &event.data.kind,
            &event.data.name,
            &event.data.status,
        )
        .await
    }

    async fn update_status(&self, id: &str, kind: &str, tag: &str, status: &str) -> Result<()> {
        let previous = self.data.read_status(id, kind, tag).await?;
        let entity = StatusEntity::observe(previous.as_ref(), id, kind, tag, status, Utc::now());
        self.data.upsert_status(&entity).await
    }
}
