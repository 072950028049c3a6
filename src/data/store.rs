//! Persistence contract for federation hosts

use async_trait::async_trait;

use super::models::FederationHost;
use crate::error::AppError;

/// Read/write access to [`FederationHost`] records.
///
/// Implementations must keep `host_fqdn` unique. Every record returned is
/// validated, every record written is validated first.
#[async_trait]
pub trait FederationHostStore: Send + Sync {
    /// Fetch by primary key. Missing rows are [`AppError::NotFound`].
    async fn get_federation_host(&self, id: i64) -> Result<FederationHost, AppError>;

    /// Look up by FQDN (case-insensitive).
    async fn find_federation_host_by_fqdn(
        &self,
        fqdn: &str,
    ) -> Result<Option<FederationHost>, AppError>;

    /// Insert `host` unless a row with the same FQDN exists, and return the
    /// stored row in either case.
    async fn create_federation_host(&self, host: &FederationHost)
    -> Result<FederationHost, AppError>;

    /// Overwrite the mutable fields of an existing host.
    async fn update_federation_host(&self, host: &FederationHost) -> Result<(), AppError>;
}
