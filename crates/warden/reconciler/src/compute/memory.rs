//! In-memory compute provider

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::*;

type ScaleSetName = (String, String);

fn scale_set_name(resource_group: &str, scale_set: &str) -> ScaleSetName {
    (resource_group.to_lowercase(), scale_set.to_lowercase())
}

/// A recorded `delete_instances` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRecord {
    pub resource_group: String,
    pub scale_set: String,
    pub instance_ids: Vec<String>,
}

/// In-memory inventory for development and testing
///
/// Deleted instances disappear from subsequent listings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompute {
    instances: Arc<RwLock<HashMap<ScaleSetName, Vec<ScaleSetInstance>>>>,
    interfaces: Arc<RwLock<HashMap<ScaleSetName, Vec<NetworkInterface>>>>,
    deletions: Arc<RwLock<Vec<DeletionRecord>>>,
}

impl InMemoryCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an instance
    pub async fn put_instance(
        &self,
        resource_group: &str,
        scale_set: &str,
        instance: ScaleSetInstance,
    ) {
        let mut instances = self.instances.write().await;
        let set = instances
            .entry(scale_set_name(resource_group, scale_set))
            .or_default();
        set.retain(|i| i.instance_id != instance.instance_id);
        set.push(instance);
    }

    pub async fn put_network_interface(
        &self,
        resource_group: &str,
        scale_set: &str,
        interface: NetworkInterface,
    ) {
        let mut interfaces = self.interfaces.write().await;
        interfaces
            .entry(scale_set_name(resource_group, scale_set))
            .or_default()
            .push(interface);
    }

    /// `delete_instances` calls issued so far, in order
    pub async fn deletions(&self) -> Vec<DeletionRecord> {
        self.deletions.read().await.clone()
    }
}

#[async_trait]
impl ComputeProvider for InMemoryCompute {
    async fn list_instances(
        &self,
        resource_group: &str,
        scale_set: &str,
    ) -> ComputeResult<Vec<ScaleSetInstance>> {
        let instances = self.instances.read().await;
        Ok(instances
            .get(&scale_set_name(resource_group, scale_set))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_instances(
        &self,
        resource_group: &str,
        scale_set: &str,
        instance_ids: &[String],
    ) -> ComputeResult<()> {
        {
            let mut instances = self.instances.write().await;
            if let Some(set) = instances.get_mut(&scale_set_name(resource_group, scale_set)) {
                set.retain(|i| !instance_ids.contains(&i.instance_id));
            }
        }
        self.deletions.write().await.push(DeletionRecord {
            resource_group: resource_group.to_string(),
            scale_set: scale_set.to_string(),
            instance_ids: instance_ids.to_vec(),
        });
        Ok(())
    }

    async fn list_network_interfaces(
        &self,
        resource_group: &str,
        scale_set: &str,
    ) -> ComputeResult<Vec<NetworkInterface>> {
        let interfaces = self.interfaces.read().await;
        Ok(interfaces
            .get(&scale_set_name(resource_group, scale_set))
            .cloned()
            .unwrap_or_default())
    }
}
