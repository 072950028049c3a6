//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;
use crate::federation::signature::{DigestAlgorithm, SignatureAlgorithm};
use crate::forgefed::SourceSoftware;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub federation: FederationConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public domain (e.g., "forge.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://forge.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Federation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Accept and send federation traffic
    pub enabled: bool,
    /// Maximum body size in bytes for federation responses and inbox bodies
    pub max_size: usize,
    /// Signature algorithms, the first one is used for signing
    pub algorithms: Vec<String>,
    /// Digest algorithm for signed bodies ("SHA-256" or "SHA-512")
    pub digest_algorithm: String,
    /// Headers covered by the signature of GET requests
    pub get_headers: Vec<String>,
    /// Headers covered by the signature of POST requests
    pub post_headers: Vec<String>,
    /// RSA key size of the instance actor
    pub key_size: usize,
    /// Software name advertised in NodeInfo
    pub software_name: String,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 4 * 1024 * 1024,
            algorithms: vec!["rsa-sha256".to_string(), "rsa-sha512".to_string()],
            digest_algorithm: "SHA-256".to_string(),
            get_headers: vec!["(request-target)".to_string(), "Date".to_string()],
            post_headers: vec![
                "(request-target)".to_string(),
                "Date".to_string(),
                "Digest".to_string(),
            ],
            key_size: 4096,
            software_name: SourceSoftware::Forgejo.as_str().to_string(),
        }
    }
}

impl FederationConfig {
    /// Algorithm used for outbound signatures.
    pub fn signing_algorithm(&self) -> Result<SignatureAlgorithm, AppError> {
        let name = self
            .algorithms
            .first()
            .ok_or_else(|| AppError::Config("federation.algorithms must not be empty".into()))?;
        SignatureAlgorithm::parse(name).ok_or_else(|| {
            AppError::Config(format!("unsupported federation.algorithms entry: {name}"))
        })
    }

    pub fn digest(&self) -> Result<DigestAlgorithm, AppError> {
        DigestAlgorithm::parse(&self.digest_algorithm).ok_or_else(|| {
            AppError::Config(format!(
                "unsupported federation.digest_algorithm: {}",
                self.digest_algorithm
            ))
        })
    }
}

/// Service configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceConfig {
    /// Domain of no-reply commit emails, `noreply.{server.domain}` if unset
    pub no_reply_address: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (FORGEFED__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/forgefed.db")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (FORGEFED__*)
            .add_source(
                Environment::with_prefix("FORGEFED")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("federation.algorithms")
                    .with_list_parse_key("federation.get_headers")
                    .with_list_parse_key("federation.post_headers")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Domain used for no-reply committer addresses.
    pub fn no_reply_address(&self) -> String {
        self.service
            .no_reply_address
            .clone()
            .unwrap_or_else(|| format!("noreply.{}", normalized_server_host(&self.server.domain)))
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        const MIN_KEY_SIZE: usize = 1024;

        if self.server.domain.trim().is_empty() {
            return Err(AppError::Config("server.domain must not be empty".to_string()));
        }

        if !matches!(self.server.protocol.as_str(), "http" | "https") {
            return Err(AppError::Config(format!(
                "server.protocol must be http or https, got {}",
                self.server.protocol
            )));
        }

        let federation = &self.federation;
        if federation.max_size == 0 {
            return Err(AppError::Config(
                "federation.max_size must be greater than 0".to_string(),
            ));
        }

        for name in &federation.algorithms {
            if SignatureAlgorithm::parse(name).is_none() {
                return Err(AppError::Config(format!(
                    "unsupported federation.algorithms entry: {name}"
                )));
            }
        }
        federation.signing_algorithm()?;
        federation.digest()?;

        if federation.key_size < MIN_KEY_SIZE {
            return Err(AppError::Config(format!(
                "federation.key_size must be at least {MIN_KEY_SIZE}"
            )));
        }

        if federation.software_name.parse::<SourceSoftware>().is_err() {
            return Err(AppError::Config(format!(
                "federation.software_name must be one of {:?}",
                crate::forgefed::KNOWN_SOURCE_SOFTWARE
            )));
        }

        crate::federation::HttpSignatureSettings::from_config(federation).validate()?;

        if self.server.protocol == "http" && !is_local_server_domain(&self.server.domain) {
            tracing::warn!(
                domain = %self.server.domain,
                "Federating over plain http on a public domain"
            );
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    host == "localhost"
        || host.ends_with(".localhost")
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
}
