//! Deletion policy for monitored instances.

use std::fmt;

use chrono::{DateTime, Utc};
use warden_types::{StateEntity, StatusEntity, StatusTarget};

use crate::config::PolicyConfig;

/// Why an instance was judged unrecoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionReason {
    /// Provider reports a failed provisioning state
    ProvisioningFailed,
    /// Health label stuck on the unhealthy value
    HealthDown,
    /// No health report within the expiration window
    HealthExpired,
}

impl fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DeletionReason::ProvisioningFailed => "ProvisioningState Failed",
            DeletionReason::HealthDown => "Service Health Down",
            DeletionReason::HealthExpired => "Service Health Expired",
        };
        f.write_str(reason)
    }
}

/// Outcome of evaluating one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    /// Still inside the grace period; no judgement this cycle
    Defer,
    Delete(DeletionReason),
}

/// Whether `state` is still inside its target's grace period.
pub fn within_grace(state: &StateEntity, target: &StatusTarget, now: DateTime<Utc>) -> bool {
    target.grace > 0 && !state.grace_elapsed(target.grace, now)
}

/// Decide the fate of one instance from its recorded state and health.
///
/// A failed provisioning state deletes unconditionally. Otherwise health is
/// only judged once the grace period has passed, and only for instances that
/// provisioned successfully.
pub fn evaluate(
    state: &StateEntity,
    status: &StatusEntity,
    target: &StatusTarget,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Decision {
    if state.state == policy.failure_value {
        return Decision::Delete(DeletionReason::ProvisioningFailed);
    }

    if within_grace(state, target, now) {
        return Decision::Defer;
    }

    if state.state != policy.success_value {
        return Decision::Keep;
    }

    if status.unhealthy_for(&target.unhealthy, target.expiration, now) {
        Decision::Delete(DeletionReason::HealthDown)
    } else if status.silent_for(target.expiration, now) {
        Decision::Delete(DeletionReason::HealthExpired)
    } else {
        Decision::Keep
    }
}
