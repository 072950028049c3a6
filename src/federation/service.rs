//! Federation service
//!
//! Inbound Like processing and outbound Like delivery.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::client::ApClient;
use super::delivery::{ActivityDelivery, DeliveryResult};
use super::resolver::FederationHostResolver;
use crate::error::AppError;
use crate::forgefed::{
    ForgeLike, ForgePerson, LIKE_TYPE, PersonId, RepositoryId, SourceSoftware,
};

/// Entry point for federated activities.
#[derive(Clone)]
pub struct FederationService {
    hosts: FederationHostResolver,
    client: Arc<ApClient>,
    delivery: ActivityDelivery,
}

impl FederationService {
    pub fn new(hosts: FederationHostResolver, client: Arc<ApClient>) -> Self {
        let delivery = ActivityDelivery::new(client.clone());
        Self {
            hosts,
            client,
            delivery,
        }
    }

    pub fn hosts(&self) -> &FederationHostResolver {
        &self.hosts
    }

    /// Accept a Like of the local repository `repository_id`.
    ///
    /// The activity is rejected with `NotAcceptable` when it is not newer
    /// than the last activity accepted from the same forge or targets a
    /// different repository; malformed identities surface as `NotValid`.
    /// On success the forge's latest activity advances to the Like's start
    /// time.
    pub async fn process_like_activity(
        &self,
        repository_id: i64,
        like: &ForgeLike,
    ) -> Result<(), AppError> {
        tracing::info!(?like, "Activity validated");

        let actor_uri = like.actor().iri();
        let mut federation_host = self.hosts.get_federation_host_for_uri(actor_uri).await?;
        if !like.is_newer(federation_host.latest_activity) {
            return Err(AppError::NotAcceptable("Activity out of order.".to_string()));
        }

        let actor_id = PersonId::new(actor_uri, &federation_host.node_info.software_name)?;
        tracing::info!(actor = %actor_id.as_uri(), "Actor accepted");

        let object_id = RepositoryId::new(like.object().iri(), SourceSoftware::Forgejo.as_str())?;
        if object_id.id() != repository_id.to_string() {
            return Err(AppError::NotAcceptable(format!(
                "Invalid objectId: {} does not address repository {}",
                object_id.id(),
                repository_id
            )));
        }
        tracing::info!(object = %object_id.as_uri(), "Object accepted");

        let person = self.fetch_person(&actor_id).await?;
        tracing::info!(
            login_name = %actor_id.as_login_name(),
            preferred_username = %person.preferred_username,
            "Fetched valid person"
        );

        federation_host.latest_activity = Some(like.start_time());
        self.hosts.update_federation_host(&federation_host).await?;

        Ok(())
    }

    async fn fetch_person(&self, person_id: &PersonId) -> Result<ForgePerson, AppError> {
        let body = self.client.get_body(&person_id.as_uri()).await?;
        Ok(ForgePerson::from_json(&body)?)
    }

    /// Send a Like from `actor_uri` to each repository in `repository_uris`.
    ///
    /// Start times are spaced one second apart in list order so the
    /// receivers see a strictly increasing sequence.
    ///
    /// # Errors
    /// Only if a Like cannot be built; delivery failures are reported in the
    /// returned results.
    pub async fn send_like_activities(
        &self,
        actor_uri: &str,
        repository_uris: &[String],
    ) -> Result<Vec<DeliveryResult>, AppError> {
        let now = Utc::now();
        let mut targets = Vec::with_capacity(repository_uris.len());

        for (offset, repository_uri) in (0_i64..).zip(repository_uris) {
            let like = ForgeLike::new(actor_uri, repository_uri, now + Duration::seconds(offset))?;
            let body = like
                .to_json()
                .map_err(|e| AppError::Internal(e.into()))?;
            targets.push((format!("{repository_uri}/inbox/"), body));
        }

        Ok(self.delivery.deliver_all(LIKE_TYPE, targets).await)
    }
}
