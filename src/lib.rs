//! forgefed-node - ForgeFed federation core for a git forge
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - NodeInfo discovery                                       │
//! │  - Instance actor and repository inboxes                    │
//! │  - Metrics                                                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Federation Layer                          │
//! │  - HTTP signatures (sign + verify)                          │
//! │  - Federation host discovery                                │
//! │  - Like processing and delivery                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `federation`: signed client, signature checks, host registry
//! - `forgefed`: ForgeFed identities, activities and NodeInfo documents
//! - `asymkey`: GPG/SSH verification of commits and tags
//! - `data`: Database layer
//! - `validation`: Aggregating validation of federated values
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod asymkey;
pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod forgefed;
pub mod metrics;
pub mod validation;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Signed HTTP client acting as the instance actor
    pub client: Arc<federation::ApClient>,

    /// Inbound Like processing and outbound delivery
    pub federation: federation::FederationService,

    /// Public keys of remote signers
    pub key_cache: Arc<federation::PublicKeyCache>,

    /// Published in the instance actor document
    pub instance_public_key_pem: Arc<String>,

    /// Commit and tag signature verification
    pub verifier: asymkey::ObjectVerifier,
}

impl AppState {
    /// Initialize application state with an empty in-memory key store.
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_key_store(config, Arc::new(asymkey::MemoryKeyStore::new())).await
    }

    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Load or create the instance actor key pair
    /// 3. Build the signed federation client
    /// 4. Build the object verifier over `key_store`
    ///
    /// # Errors
    /// Returns error if any initialization step fails, including an
    /// HTTP signature configuration that cannot be honoured.
    pub async fn with_key_store(
        config: config::AppConfig,
        key_store: Arc<dyn asymkey::KeyStore>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        let keys = Self::ensure_instance_actor(&db, &config).await?;

        let settings = federation::HttpSignatureSettings::from_config(&config.federation);
        let client = Arc::new(federation::ApClient::new(
            settings,
            &keys.private_key_pem,
            &instance_actor_uri(&config.server),
        )?);
        tracing::info!(key_id = %client.key_id(), "Federation client initialized");

        let hosts = federation::FederationHostResolver::new(db.clone(), client.clone());
        let federation = federation::FederationService::new(hosts, client.clone());
        let key_cache = Arc::new(federation::PublicKeyCache::new(client.clone(), None));

        let no_reply_address = config.no_reply_address();
        tracing::info!(%no_reply_address, "Object verifier initialized");
        let verifier = asymkey::ObjectVerifier::new(key_store, no_reply_address);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            client,
            federation,
            key_cache,
            instance_public_key_pem: Arc::new(keys.public_key_pem),
            verifier,
        })
    }

    /// IRI of the instance actor.
    pub fn actor_uri(&self) -> String {
        instance_actor_uri(&self.config.server)
    }

    /// Load the instance actor keys, generating them on first start.
    ///
    /// Concurrent first starts agree on whichever pair was stored first.
    async fn ensure_instance_actor(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<data::InstanceActorKeys, error::AppError> {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
        use rsa::{RsaPrivateKey, RsaPublicKey};

        if let Some(keys) = db.get_instance_actor_keys().await? {
            tracing::info!("Instance actor exists");
            return Ok(keys);
        }

        tracing::info!(
            bits = config.federation.key_size,
            "Creating instance actor key pair..."
        );

        let bits = config.federation.key_size;
        let private_key = tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            RsaPrivateKey::new(&mut rng, bits)
        })
        .await
        .map_err(|e| error::AppError::Internal(e.into()))?
        .map_err(|e| error::AppError::Internal(e.into()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let keys = data::InstanceActorKeys {
            private_key_pem: private_key
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| error::AppError::Internal(e.into()))?
                .to_string(),
            public_key_pem: public_key
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| error::AppError::Internal(e.into()))?,
            created_at: chrono::Utc::now(),
        };

        if db.insert_instance_actor_keys_if_empty(&keys).await? {
            tracing::info!("Instance actor created");
            return Ok(keys);
        }

        db.get_instance_actor_keys().await?.ok_or_else(|| {
            error::AppError::Internal(anyhow::anyhow!("instance actor keys vanished"))
        })
    }
}

fn instance_actor_uri(server: &config::ServerConfig) -> String {
    format!("{}{}", server.base_url(), api::ACTOR_PATH)
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::extract::DefaultBodyLimit;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    let max_body = state.config.federation.max_size;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::wellknown_router())
        .merge(api::activitypub_router())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
