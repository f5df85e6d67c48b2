//! Backend configuration derivation.
//!
//! Every recorded instance that has both a health target and a load-balancer
//! target, and is past its grace period, contributes one `server` line to its
//! frontend's backend list. One blob is written per frontend with at least
//! one line.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{debug, info, instrument};
use warden_types::{instance_to_host_name, BackendTarget, ResourceId, ScaleSetKey, StateEntity};

use super::policy::within_grace;
use super::Reconciler;
use crate::compute::ComputeProvider;
use crate::error::Result;
use crate::storage::Storage;

/// Private IPs of one scale set keyed by lower-cased virtual machine id.
type AddressBook = HashMap<String, String>;

/// Render one backend line for `state`, served at `address:port`.
pub fn backend_line(
    resource: &ResourceId,
    state: &StateEntity,
    address: &str,
    port: u16,
) -> String {
    format!(
        "server vmss--{}--{}--{}--{}--{}--{} {}:{} check\n",
        resource.subscription_id(),
        resource.resource_group(),
        resource.name(),
        state.tag,
        state.state,
        state.created_when.format("%Y-%m-%dT%H:%M:%S"),
        address,
        port,
    )
}

impl<S: Storage, C: ComputeProvider> Reconciler<S, C> {
    /// Derive and write the backend list of every load-balancer frontend.
    #[instrument(skip(self))]
    pub async fn backends(&self) -> Result<()> {
        if !self.ensure_ready("backends").await? {
            return Ok(());
        }

        let states = self.data.read_states().await?;
        let now = Utc::now();
        let mut configs: BTreeMap<String, String> = BTreeMap::new();
        let mut address_books: HashMap<ScaleSetKey, AddressBook> = HashMap::new();

        for state in &states {
            let Some(target) = self.targets.status_target_for(&state.id) else {
                continue;
            };
            let Some(balancer) = self.targets.balancer_target_for(&state.id) else {
                continue;
            };
            let Some(backend) = balancer.backend(&state.id) else {
                continue;
            };

            if within_grace(state, target, now) {
                debug!(resource_id = %state.id, tag = %state.tag, "Backend within grace period");
                continue;
            }

            let resource = ResourceId::parse(state.id.as_str())?;
            let address = self
                .backend_address(&resource, state, backend, &mut address_books)
                .await?;

            configs
                .entry(balancer.frontend.clone())
                .or_default()
                .push_str(&backend_line(&resource, state, &address, self.config.backends.port));
        }

        info!(frontends = configs.len(), "Writing backend configuration");

        let container = &self.config.backends.container;
        try_join_all(configs.into_iter().map(move |(frontend, text)| async move {
            let path = format!("template{frontend}/latest.cfg");
            self.data.write_text(container, &path, text).await
        }))
        .await?;

        Ok(())
    }

    /// Private IP of the instance if its network interface is known,
    /// otherwise its host name.
    async fn backend_address(
        &self,
        resource: &ResourceId,
        state: &StateEntity,
        backend: &BackendTarget,
        address_books: &mut HashMap<ScaleSetKey, AddressBook>,
    ) -> Result<String> {
        let scale_set = ScaleSetKey::from_resource(resource);
        if !address_books.contains_key(&scale_set) {
            let interfaces = self
                .compute
                .list_network_interfaces(resource.resource_group(), resource.name())
                .await?;
            let book = interfaces
                .into_iter()
                .filter_map(|nic| {
                    Some((nic.virtual_machine_id?.to_lowercase(), nic.private_ip_address?))
                })
                .collect();
            address_books.insert(scale_set.clone(), book);
        }

        let vm_id = format!("{}/virtualMachines/{}", resource.uri(), state.tag).to_lowercase();
        if let Some(ip) = address_books.get(&scale_set).and_then(|book| book.get(&vm_id)) {
            return Ok(ip.clone());
        }

        Ok(match state.tag.parse::<u64>() {
            Ok(ordinal) => instance_to_host_name(&backend.prefix, ordinal),
            Err(_) => state.tag.clone(),
        })
    }
}
