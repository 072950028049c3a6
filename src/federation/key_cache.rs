//! Public Key Caching
//!
//! Caches the `publicKeyPem` of remote actors that sign requests to our
//! inboxes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::client::ApClient;
use crate::error::AppError;
use crate::forgefed::ForgePerson;

/// Cached public key entry
#[derive(Debug, Clone)]
struct CachedKey {
    /// PEM-encoded public key
    pem: String,
    /// When this entry was cached
    cached_at: Instant,
    ttl: Duration,
}

impl CachedKey {
    fn is_valid(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

/// Public key cache
///
/// Thread-safe cache for remote actor public keys, keyed by `keyId`.
pub struct PublicKeyCache {
    cache: Arc<RwLock<HashMap<String, CachedKey>>>,
    client: Arc<ApClient>,
    default_ttl: Duration,
}

/// Fetch the actor document behind `key_id` and return its public key.
///
/// The actor may be a person or an instance actor, so the document is only
/// required to carry a `publicKey` whose id matches `key_id`.
pub async fn fetch_public_key(key_id: &str, client: &ApClient) -> Result<String, AppError> {
    let actor_url = key_id.split('#').next().unwrap_or(key_id);
    url::Url::parse(actor_url)
        .map_err(|e| AppError::Validation(format!("Invalid actor URL: {}", e)))?;

    let body = client.get_body(actor_url).await?;
    let actor: ForgePerson = serde_json::from_slice(&body)
        .map_err(|e| AppError::Federation(format!("Failed to parse actor: {}", e)))?;

    let public_key = actor
        .public_key
        .ok_or_else(|| AppError::Federation("Missing publicKey in actor".to_string()))?;

    if key_id.contains('#') && public_key.id != key_id {
        return Err(AppError::Validation(
            "Signature keyId does not match actor public key id".to_string(),
        ));
    }

    Ok(public_key.public_key_pem)
}

impl PublicKeyCache {
    /// Create new public key cache
    ///
    /// # Arguments
    /// * `client` - Signed client for fetching actor documents
    /// * `default_ttl` - TTL for cached keys (default: 1 hour)
    pub fn new(client: Arc<ApClient>, default_ttl: Option<Duration>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            client,
            default_ttl: default_ttl.unwrap_or(Duration::from_secs(3600)),
        }
    }

    /// Get public key for a key ID
    ///
    /// Checks cache first, fetches from remote if not cached or expired.
    pub async fn get(&self, key_id: &str) -> Result<String, AppError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(key_id) {
                if cached.is_valid() {
                    tracing::debug!("Public key cache hit for {}", key_id);
                    return Ok(cached.pem.clone());
                }
                tracing::debug!("Public key cache expired for {}", key_id);
            }
        }

        tracing::debug!("Public key cache miss for {}, fetching...", key_id);
        let pem = fetch_public_key(key_id, &self.client).await?;

        self.cache.write().await.insert(
            key_id.to_string(),
            CachedKey {
                pem: pem.clone(),
                cached_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );

        Ok(pem)
    }

    /// Invalidate a cached key, e.g. after a failed verification.
    pub async fn invalidate(&self, key_id: &str) {
        self.cache.write().await.remove(key_id);
        tracing::debug!("Invalidated public key cache for {}", key_id);
    }

    pub async fn stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        let total = cache.len();
        let valid = cache.values().filter(|v| v.is_valid()).count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }

    /// Prune expired entries
    ///
    /// Called periodically from the background task in `main`.
    pub async fn prune_expired(&self) {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, v| v.is_valid());
        let removed = before - cache.len();

        if removed > 0 {
            tracing::info!("Pruned {} expired public key cache entries", removed);
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}
