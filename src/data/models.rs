//! Data models
//!
//! Rust structs representing database entities.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::forgefed::NodeInfo;
use crate::validation::{NotValid, Validate, is_valid, validate_max_len, validate_not_empty};

/// Tolerated clock skew for a remote host's latest activity.
pub const LATEST_ACTIVITY_MAX_SKEW_MINUTES: i64 = 10;

pub const HOST_FQDN_MAX_LEN: usize = 255;

// =============================================================================
// Federation host
// =============================================================================

/// A remote forge instance we have been in contact with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationHost {
    /// Zero until persisted
    pub id: i64,
    pub host_fqdn: String,
    pub node_info: NodeInfo,
    /// `None` when no activity was accepted yet
    pub latest_activity: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl FederationHost {
    /// New, not yet persisted host. The FQDN is stored lowercase.
    pub fn new(node_info: NodeInfo, host_fqdn: &str) -> Result<Self, NotValid> {
        let now = Utc::now();
        let host = Self {
            id: 0,
            host_fqdn: host_fqdn.to_lowercase(),
            node_info,
            latest_activity: None,
            created: now,
            updated: now,
        };
        is_valid(&host)?;
        Ok(host)
    }
}

impl Validate for FederationHost {
    const TYPE_NAME: &'static str = "FederationHost";

    fn validate(&self) -> Vec<String> {
        let mut result = Vec::new();
        result.extend(validate_not_empty(&self.host_fqdn, "HostFqdn"));
        result.extend(validate_max_len(&self.host_fqdn, HOST_FQDN_MAX_LEN, "HostFqdn"));
        result.extend(self.node_info.validate());

        if self.host_fqdn != self.host_fqdn.to_lowercase() {
            result.push(format!(
                "HostFqdn has to be lower case but was: {}",
                self.host_fqdn
            ));
        }

        let horizon = Utc::now() + Duration::minutes(LATEST_ACTIVITY_MAX_SKEW_MINUTES);
        if let Some(latest) = self.latest_activity.filter(|latest| *latest > horizon) {
            result.push(format!(
                "Latest Activity cannot be in the far future: {latest}"
            ));
        }

        result
    }
}

/// Row shape of `federation_host`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FederationHostRow {
    pub id: i64,
    pub host_fqdn: String,
    pub software_name: String,
    pub latest_activity: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<FederationHostRow> for FederationHost {
    fn from(row: FederationHostRow) -> Self {
        Self {
            id: row.id,
            host_fqdn: row.host_fqdn,
            node_info: NodeInfo {
                software_name: row.software_name,
            },
            latest_activity: row.latest_activity,
            created: row.created,
            updated: row.updated,
        }
    }
}

// =============================================================================
// Instance actor
// =============================================================================

/// Key material of the instance actor used to sign outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InstanceActorKeys {
    /// RSA private key (PEM format)
    pub private_key_pem: String,
    /// RSA public key (PEM format)
    pub public_key_pem: String,
    pub created_at: DateTime<Utc>,
}
