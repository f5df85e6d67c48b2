//! Health and load-balancer target policies.
//!
//! Both tables are supplied as JSON arrays, loaded once and then only read.
//! Lookups by resource id are case-insensitive linear scans in declaration
//! order; the first matching target wins.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TargetError;

/// Environment variable holding the health target table.
pub const STATUS_TARGETS_VAR: &str = "STATUS_TARGETS";

/// Environment variable holding the load-balancer target table.
pub const BACKEND_TARGETS_VAR: &str = "BACKEND_TARGETS";

/// Health monitoring policy for a set of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTarget {
    pub name: String,

    /// Resource kind, e.g. `VirtualMachineScaleSet`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Monitored resource ids.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Health label that counts as unhealthy.
    pub unhealthy: String,

    /// Seconds of sustained bad health or silence before deletion.
    pub expiration: u64,

    /// Seconds after creation during which health is not judged.
    #[serde(default)]
    pub grace: u64,

    /// Minimum instance count.
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

impl StatusTarget {
    pub fn covers(&self, id: &str) -> bool {
        self.resources.iter().any(|r| r.eq_ignore_ascii_case(id))
    }
}

fn default_minimum() -> u32 {
    1
}

/// One backend pool member of a load-balancer frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTarget {
    /// Scale set resource id.
    pub id: String,

    /// Host name prefix of the scale set's instances.
    #[serde(default)]
    pub prefix: String,
}

/// Load-balancer frontend and the backends it routes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerTarget {
    pub frontend: String,

    #[serde(default)]
    pub backends: Vec<BackendTarget>,
}

impl BalancerTarget {
    pub fn backend(&self, id: &str) -> Option<&BackendTarget> {
        self.backends.iter().find(|b| b.id.eq_ignore_ascii_case(id))
    }
}

/// Immutable policy tables handed to the engine at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    status_targets: Vec<StatusTarget>,
    balancer_targets: Vec<BalancerTarget>,
}

impl TargetRegistry {
    pub fn new(status_targets: Vec<StatusTarget>, balancer_targets: Vec<BalancerTarget>) -> Self {
        Self {
            status_targets,
            balancer_targets,
        }
    }

    /// Parse both tables. Empty input means an empty table.
    pub fn from_json(status_json: &str, balancer_json: &str) -> Result<Self, TargetError> {
        Ok(Self::new(
            parse_table(status_json, "status")?,
            parse_table(balancer_json, "backend")?,
        ))
    }

    /// Parse both tables, degrading a malformed table to an empty one.
    pub fn from_json_lenient(status_json: &str, balancer_json: &str) -> Self {
        Self::new(
            lenient(parse_table(status_json, "status")),
            lenient(parse_table(balancer_json, "backend")),
        )
    }

    /// Read both tables from [`STATUS_TARGETS_VAR`] and [`BACKEND_TARGETS_VAR`].
    pub fn from_env() -> Self {
        let status = std::env::var(STATUS_TARGETS_VAR).unwrap_or_default();
        let balancer = std::env::var(BACKEND_TARGETS_VAR).unwrap_or_default();
        Self::from_json_lenient(&status, &balancer)
    }

    pub fn status_targets(&self) -> &[StatusTarget] {
        &self.status_targets
    }

    pub fn balancer_targets(&self) -> &[BalancerTarget] {
        &self.balancer_targets
    }

    /// First health target monitoring `id`.
    pub fn status_target_for(&self, id: &str) -> Option<&StatusTarget> {
        self.status_targets.iter().find(|t| t.covers(id))
    }

    /// First load-balancer target with a backend `id`.
    pub fn balancer_target_for(&self, id: &str) -> Option<&BalancerTarget> {
        self.balancer_targets.iter().find(|t| t.backend(id).is_some())
    }
}

fn parse_table<T>(json: &str, table: &'static str) -> Result<Vec<T>, TargetError>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json).map_err(|source| TargetError::Malformed { table, source })
}

fn lenient<T>(result: Result<Vec<T>, TargetError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "ignoring target table");
        Vec::new()
    })
}
