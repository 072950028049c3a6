//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use forgefed_node::federation::{ApClient, HttpSignatureSettings};
use forgefed_node::{AppState, config};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_KEY_SIZE: usize = 1024;

/// RSA key pair as (PKCS#8 private PEM, SPKI public PEM).
pub fn generate_keypair() -> (String, String) {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, TEST_KEY_SIZE).unwrap();
    let public_key = RsaPublicKey::from(&private_key);
    (
        private_key
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .to_string(),
        public_key.to_public_key_pem(LineEnding::LF).unwrap(),
    )
}

async fn bind_localhost() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub fn test_config(domain: &str, db_path: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            domain: domain.to_string(),
            protocol: "http".to_string(),
        },
        database: config::DatabaseConfig { path: db_path },
        federation: config::FederationConfig {
            key_size: TEST_KEY_SIZE,
            ..Default::default()
        },
        service: config::ServiceConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
///
/// Served on `localhost` rather than an IP literal, since actor IRIs must
/// name a host.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Start a server after `customize` adjusted the default test config.
    pub async fn with_config(customize: impl FnOnce(&mut config::AppConfig)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let (listener, port) = bind_localhost().await;
        let domain = format!("localhost:{port}");
        let mut config = test_config(&domain, db_path);
        customize(&mut config);

        let state = AppState::new(config).await.unwrap();
        let app = forgefed_node::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            addr: format!("http://{domain}"),
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn repository_uri(&self, id: i64) -> String {
        self.url(&format!("/api/v1/activitypub/repository-id/{id}"))
    }
}

/// Requests a [`MockForge`] received on its repository inbox.
#[derive(Debug, Clone)]
pub struct ReceivedActivity {
    pub repository_id: i64,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct MockForgeState {
    base_url: String,
    software_name: String,
    public_key_pem: Arc<Mutex<String>>,
    received: Arc<Mutex<Vec<ReceivedActivity>>>,
}

/// A remote forge with one person (`user-id/1`) and repository inboxes.
pub struct MockForge {
    pub base_url: String,
    pub private_key_pem: String,
    state: MockForgeState,
}

impl MockForge {
    pub async fn start() -> Self {
        Self::start_as("forgejo").await
    }

    /// Start a forge announcing `software_name` in its NodeInfo.
    pub async fn start_as(software_name: &str) -> Self {
        let (private_key_pem, public_key_pem) = generate_keypair();
        let (listener, port) = bind_localhost().await;
        let base_url = format!("http://localhost:{port}");

        let state = MockForgeState {
            base_url: base_url.clone(),
            software_name: software_name.to_string(),
            public_key_pem: Arc::new(Mutex::new(public_key_pem)),
            received: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/.well-known/nodeinfo", get(nodeinfo_links))
            .route("/api/v1/nodeinfo", get(nodeinfo))
            .route("/api/v1/activitypub/user-id/:id", get(person))
            .route(
                "/api/v1/activitypub/repository-id/:id/inbox/",
                post(repository_inbox),
            )
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            private_key_pem,
            state,
        }
    }

    pub fn person_uri(&self) -> String {
        format!("{}/api/v1/activitypub/user-id/1", self.base_url)
    }

    pub fn repository_uri(&self, id: i64) -> String {
        format!("{}/api/v1/activitypub/repository-id/{id}", self.base_url)
    }

    /// Client signing as the forge's person.
    pub fn signing_client(&self) -> ApClient {
        let settings = HttpSignatureSettings::from_config(&config::FederationConfig::default());
        ApClient::new(settings, &self.private_key_pem, &self.person_uri()).unwrap()
    }

    /// Replace the published key, as if the person rotated it.
    pub fn rotate_key(&mut self) {
        let (private_key_pem, public_key_pem) = generate_keypair();
        self.private_key_pem = private_key_pem;
        *self.state.public_key_pem.lock().unwrap() = public_key_pem;
    }

    pub fn received(&self) -> Vec<ReceivedActivity> {
        self.state.received.lock().unwrap().clone()
    }
}

async fn nodeinfo_links(State(state): State<MockForgeState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "links": [{
            "href": format!("{}/api/v1/nodeinfo", state.base_url),
            "rel": "http://nodeinfo.diaspora.software/ns/schema/2.1"
        }]
    }))
}

async fn nodeinfo(State(state): State<MockForgeState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": "2.1",
        "software": { "name": state.software_name, "version": "9.0.0" },
        "protocols": ["activitypub"]
    }))
}

async fn person(
    State(state): State<MockForgeState>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    let actor = format!("{}/api/v1/activitypub/user-id/{id}", state.base_url);
    let public_key_pem = state.public_key_pem.lock().unwrap().clone();
    Json(serde_json::json!({
        "@context": ["https://www.w3.org/ns/activitystreams"],
        "id": actor,
        "type": "Person",
        "preferredUsername": format!("user{id}"),
        "inbox": format!("{actor}/inbox"),
        "publicKey": {
            "id": format!("{actor}#main-key"),
            "owner": actor,
            "publicKeyPem": public_key_pem
        }
    }))
}

async fn repository_inbox(
    State(state): State<MockForgeState>,
    Path(repository_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    state.received.lock().unwrap().push(ReceivedActivity {
        repository_id,
        headers,
        body,
    });
    StatusCode::NO_CONTENT
}
