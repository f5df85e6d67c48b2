//! Persisted lifecycle (state) and health (status) records.
//!
//! Both records are identified by `(id, kind, tag)`, encoded into a single
//! lower-cased row key by [`generate_row_key`]. For state records the tag is
//! the instance ordinal; for status records it is the host name the instance
//! reported itself under.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HostNameError;
use crate::hostname::host_name_to_instance_id;
use crate::index::Indexed;

/// Encode an entity identity into its storage row key.
pub fn generate_row_key(id: &str, kind: &str, tag: &str) -> String {
    format!("{}$${}$${}", kind, id.replace('/', "--"), tag).to_lowercase()
}

/// Last known provisioning state of one scale set instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntity {
    /// Scale set resource id.
    pub id: String,

    /// Resource kind, e.g. `VirtualMachineScaleSet`.
    pub kind: String,

    /// Instance ordinal.
    pub tag: String,

    /// First time the instance was observed.
    pub created_when: DateTime<Utc>,

    /// Provisioning state as reported by the compute provider.
    pub state: String,
}

impl StateEntity {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        tag: impl Into<String>,
        created_when: DateTime<Utc>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            tag: tag.into(),
            created_when,
            state: state.into(),
        }
    }

    pub fn row_key(&self) -> String {
        generate_row_key(&self.id, &self.kind, &self.tag)
    }

    /// Whether `grace_secs` have passed since the instance was first seen.
    pub fn grace_elapsed(&self, grace_secs: u64, now: DateTime<Utc>) -> bool {
        elapsed(self.created_when, grace_secs, now)
    }
}

impl Indexed for StateEntity {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

/// Last known externally reported health of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntity {
    /// Scale set resource id.
    pub id: String,

    /// Resource kind.
    pub kind: String,

    /// Host name the instance reported under.
    pub tag: String,

    /// Last time `status` changed value.
    pub changed_when: DateTime<Utc>,

    /// Health label, e.g. `UP` or `DOWN`.
    pub status: String,

    /// Last time a report arrived, whether or not the label changed.
    pub timestamp: DateTime<Utc>,
}

impl StatusEntity {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        tag: impl Into<String>,
        changed_when: DateTime<Utc>,
        status: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            tag: tag.into(),
            changed_when,
            status: status.into(),
            timestamp,
        }
    }

    /// Fold a new health report into the previous record, if any.
    ///
    /// `changed_when` only moves when the label differs from the previous
    /// one; `timestamp` always moves to `now`.
    pub fn observe(
        previous: Option<&StatusEntity>,
        id: &str,
        kind: &str,
        tag: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let changed_when = match previous {
            Some(previous) if previous.status == status => previous.changed_when,
            _ => now,
        };
        Self::new(id, kind, tag, changed_when, status, now)
    }

    pub fn row_key(&self) -> String {
        generate_row_key(&self.id, &self.kind, &self.tag)
    }

    /// Instance ordinal decoded from the host name tag.
    pub fn instance_ordinal(&self) -> Result<u64, HostNameError> {
        host_name_to_instance_id(&self.tag)
    }

    /// Whether the label has been `unhealthy` for at least `expiration_secs`.
    pub fn unhealthy_for(&self, unhealthy: &str, expiration_secs: u64, now: DateTime<Utc>) -> bool {
        self.status == unhealthy && elapsed(self.changed_when, expiration_secs, now)
    }

    /// Whether no report has arrived for at least `expiration_secs`.
    pub fn silent_for(&self, expiration_secs: u64, now: DateTime<Utc>) -> bool {
        elapsed(self.timestamp, expiration_secs, now)
    }
}

impl Indexed for StatusEntity {
    fn resource_id(&self) -> &str {
        &self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

/// `since + secs <= now`, treating an unrepresentable deadline as never reached.
fn elapsed(since: DateTime<Utc>, secs: u64, now: DateTime<Utc>) -> bool {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|window| since.checked_add_signed(window))
        .is_some_and(|deadline| deadline <= now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB: &str =
        "/subscriptions/Sub/resourceGroups/RG/providers/Microsoft.Compute/virtualMachineScaleSets/Web";
    const KIND: &str = "VirtualMachineScaleSet";

    #[test]
    fn test_row_key_format() {
        assert_eq!(
            generate_row_key(WEB, "VirtualMachineScaleSet", "3"),
            "virtualmachinescaleset$$--subscriptions--sub--resourcegroups--rg--providers--microsoft.compute--virtualmachinescalesets--web$$3"
        );
    }

    #[test]
    fn test_entities_share_row_key_format() {
        let now = Utc::now();
        let state = StateEntity::new(WEB, "VirtualMachineScaleSet", "web000003", now, "Succeeded");
        let status = StatusEntity::new(WEB, "VirtualMachineScaleSet", "web000003", now, "UP", now);
        assert_eq!(state.row_key(), status.row_key());
    }

    #[test]
    fn test_observe_preserves_changed_when_for_same_label() {
        let first = Utc::now() - Duration::minutes(10);
        let now = Utc::now();
        let previous = StatusEntity::new(WEB, KIND, "web000001", first, "UP", first);

        let same = StatusEntity::observe(Some(&previous), WEB, KIND, "web000001", "UP", now);
        assert_eq!(same.changed_when, first);
        assert_eq!(same.timestamp, now);

        let changed = StatusEntity::observe(Some(&previous), WEB, KIND, "web000001", "DOWN", now);
        assert_eq!(changed.changed_when, now);
        assert_eq!(changed.timestamp, now);

        let fresh = StatusEntity::observe(None, WEB, KIND, "web000001", "UP", now);
        assert_eq!(fresh.changed_when, now);
    }

    #[test]
    fn test_expiration_windows() {
        let now = Utc::now();
        let status = StatusEntity::new(
            WEB,
            "VirtualMachineScaleSet",
            "web000001",
            now - Duration::seconds(120),
            "DOWN",
            now - Duration::seconds(30),
        );
        assert!(status.unhealthy_for("DOWN", 60, now));
        assert!(!status.unhealthy_for("DOWN", 300, now));
        assert!(!status.unhealthy_for("FAILED", 60, now));
        assert!(status.silent_for(30, now));
        assert!(!status.silent_for(31, now));
    }

    #[test]
    fn test_grace_elapsed() {
        let now = Utc::now();
        let state = StateEntity::new(WEB, KIND, "1", now - Duration::seconds(90), "Succeeded");
        assert!(state.grace_elapsed(0, now));
        assert!(state.grace_elapsed(90, now));
        assert!(!state.grace_elapsed(91, now));
    }

    #[test]
    fn test_instance_ordinal() {
        let now = Utc::now();
        let status = StatusEntity::new(WEB, "VirtualMachineScaleSet", "web00000B", now, "UP", now);
        assert_eq!(status.instance_ordinal().unwrap(), 11);
    }
}
