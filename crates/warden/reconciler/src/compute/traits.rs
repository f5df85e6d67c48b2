//! Compute provider trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::error::ComputeResult;

/// One live scale set instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSetInstance {
    /// Instance ordinal within the scale set
    pub instance_id: String,

    pub provisioning_state: String,
}

impl ScaleSetInstance {
    pub fn new(instance_id: impl Into<String>, provisioning_state: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            provisioning_state: provisioning_state.into(),
        }
    }
}

/// Network interface attached to a scale set instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Resource id of the virtual machine the interface is attached to
    pub virtual_machine_id: Option<String>,

    /// Primary private IP address
    pub private_ip_address: Option<String>,
}

/// Live scale set inventory
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// List the instances of a scale set
    async fn list_instances(
        &self,
        resource_group: &str,
        scale_set: &str,
    ) -> ComputeResult<Vec<ScaleSetInstance>>;

    /// Delete instances by ordinal
    async fn delete_instances(
        &self,
        resource_group: &str,
        scale_set: &str,
        instance_ids: &[String],
    ) -> ComputeResult<()>;

    /// List the network interfaces of a scale set
    async fn list_network_interfaces(
        &self,
        resource_group: &str,
        scale_set: &str,
    ) -> ComputeResult<Vec<NetworkInterface>>;
}
