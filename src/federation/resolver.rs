//! Federation host registry
//!
//! Maps actor IRIs to the remote forge they live on, discovering unknown
//! forges through NodeInfo.

use std::sync::Arc;

use super::client::ApClient;
use crate::data::{FederationHost, FederationHostStore};
use crate::error::AppError;
use crate::forgefed::{ActorId, NodeInfo, NodeInfoWellKnown};
use crate::metrics::FEDERATION_HOSTS_CREATED_TOTAL;

/// Resolves and registers remote forges.
#[derive(Clone)]
pub struct FederationHostResolver {
    store: Arc<dyn FederationHostStore>,
    client: Arc<ApClient>,
}

impl FederationHostResolver {
    pub fn new(store: Arc<dyn FederationHostStore>, client: Arc<ApClient>) -> Self {
        Self { store, client }
    }

    /// Look up the forge hosting `actor_uri`, registering it on first contact.
    ///
    /// # Errors
    /// - `NotValid` if `actor_uri` is not a valid actor IRI or the remote
    ///   NodeInfo is unusable
    /// - transport errors from discovery
    pub async fn get_federation_host_for_uri(
        &self,
        actor_uri: &str,
    ) -> Result<FederationHost, AppError> {
        tracing::debug!(actor_uri, "Resolving federation host");
        let actor_id = ActorId::parse(actor_uri)?;

        match self
            .store
            .find_federation_host_by_fqdn(actor_id.host())
            .await?
        {
            Some(host) => Ok(host),
            None => self.create_federation_host_from_ap(&actor_id).await,
        }
    }

    /// Discover the forge of `actor_id` via NodeInfo and store it.
    ///
    /// Nothing is persisted unless both discovery documents validate.
    pub async fn create_federation_host_from_ap(
        &self,
        actor_id: &ActorId,
    ) -> Result<FederationHost, AppError> {
        let body = self
            .client
            .get_body(&actor_id.as_well_known_node_info_uri())
            .await?;
        let well_known = NodeInfoWellKnown::from_json(&body)?;

        let body = self.client.get_body(&well_known.href).await?;
        let node_info = NodeInfo::from_json(&body)?;

        let host = FederationHost::new(node_info, actor_id.host())?;
        let stored = self.store.create_federation_host(&host).await?;

        FEDERATION_HOSTS_CREATED_TOTAL.inc();
        tracing::info!(
            host = %stored.host_fqdn,
            software = %stored.node_info.software_name,
            "Registered federation host"
        );
        Ok(stored)
    }

    pub async fn update_federation_host(&self, host: &FederationHost) -> Result<(), AppError> {
        self.store.update_federation_host(host).await
    }
}
