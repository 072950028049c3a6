//! Signed ActivityPub HTTP client
//!
//! Every outbound federation request goes through [`ApClient`]: it is
//! signed with the instance actor key, bounded by a fixed timeout and a
//! maximum body size, and can be cancelled by the caller.

use std::time::{Duration, Instant};

use chrono::Utc;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::signature::{
    ACTIVITY_STREAMS_CONTENT_TYPE, DigestAlgorithm, REQUEST_TARGET, RequestSigner,
    SignatureAlgorithm,
};
use crate::config::FederationConfig;
use crate::error::AppError;
use crate::metrics::observe_outbound_request;

/// Deadline of every outbound federation call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("forgefed-node/", env!("CARGO_PKG_VERSION"));

/// Limit a string to `limit` characters for logging.
pub fn char_limiter(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

/// Header sets and algorithms used to sign requests.
#[derive(Debug, Clone)]
pub struct HttpSignatureSettings {
    pub algorithm: String,
    pub digest_algorithm: String,
    pub get_headers: Vec<String>,
    pub post_headers: Vec<String>,
    pub max_size: usize,
}

impl HttpSignatureSettings {
    pub fn from_config(config: &FederationConfig) -> Self {
        Self {
            algorithm: config.algorithms.first().cloned().unwrap_or_default(),
            digest_algorithm: config.digest_algorithm.clone(),
            get_headers: config.get_headers.clone(),
            post_headers: config.post_headers.clone(),
            max_size: config.max_size,
        }
    }

    /// Both header sets must cover the request target and date; POST must
    /// also cover the body digest.
    pub fn validate(&self) -> Result<(), AppError> {
        contains_required_http_headers("GET", &self.get_headers)?;
        contains_required_http_headers("POST", &self.post_headers)?;
        Ok(())
    }

    fn signature_algorithm(&self) -> Result<SignatureAlgorithm, AppError> {
        SignatureAlgorithm::parse(&self.algorithm).ok_or_else(|| {
            AppError::Config(format!("unsupported signature algorithm: {}", self.algorithm))
        })
    }

    fn digest(&self) -> Result<DigestAlgorithm, AppError> {
        DigestAlgorithm::parse(&self.digest_algorithm).ok_or_else(|| {
            AppError::Config(format!(
                "unsupported digest algorithm: {}",
                self.digest_algorithm
            ))
        })
    }
}

fn contains_required_http_headers(method: &str, headers: &[String]) -> Result<(), AppError> {
    let has = |name: &str| headers.iter().any(|h| h.eq_ignore_ascii_case(name));

    let missing = if !has(REQUEST_TARGET) {
        Some(REQUEST_TARGET)
    } else if !has("Date") {
        Some("Date")
    } else if method != "GET" && !has("Digest") {
        Some("Digest")
    } else {
        None
    };

    match missing {
        Some(header) => Err(AppError::Config(format!(
            "missing http header for {method}: {header}"
        ))),
        None => Ok(()),
    }
}

/// HTTP client for federation requests
#[derive(Debug)]
pub struct ApClient {
    http: reqwest::Client,
    signer: RequestSigner,
    settings: HttpSignatureSettings,
}

impl ApClient {
    /// Create a client signing as `actor_uri` with `private_key_pem`.
    ///
    /// # Errors
    /// `Config` if the header sets are incomplete or the key is unusable.
    pub fn new(
        settings: HttpSignatureSettings,
        private_key_pem: &str,
        actor_uri: &str,
    ) -> Result<Self, AppError> {
        settings.validate()?;

        let signer = RequestSigner::new(
            private_key_pem,
            format!("{actor_uri}#main-key"),
            settings.signature_algorithm()?,
            settings.digest()?,
        )?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            signer,
            settings,
        })
    }

    pub fn key_id(&self) -> &str {
        self.signer.key_id()
    }

    fn signed_request(
        &self,
        method: reqwest::Method,
        to: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let url = Url::parse(to)
            .map_err(|e| AppError::Validation(format!("Invalid federation url {to}: {e}")))?;

        let header_names = if method == reqwest::Method::GET {
            &self.settings.get_headers
        } else {
            &self.settings.post_headers
        };

        let mut extra = HeaderMap::new();
        extra.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(ACTIVITY_STREAMS_CONTENT_TYPE),
        );
        let signed = self
            .signer
            .sign(method.as_str(), &url, header_names, &extra, &body, Utc::now())?;

        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", ACTIVITY_STREAMS_CONTENT_TYPE)
            .header("Accept", ACTIVITY_STREAMS_CONTENT_TYPE)
            .header("Date", signed.date)
            .header("Signature", signed.signature);
        if let Some(digest) = signed.digest {
            request = request.header("Digest", digest);
        }
        Ok(request.body(body))
    }

    async fn send(&self, request: reqwest::RequestBuilder, to: &str) -> Result<reqwest::Response, AppError> {
        let started = Instant::now();
        let result = request.send().await;
        match &result {
            Ok(response) => observe_outbound_request(response.status().as_str(), started.elapsed()),
            Err(_) => observe_outbound_request("error", started.elapsed()),
        }
        result.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(to.to_string())
            } else {
                AppError::HttpClient(e)
            }
        })
    }

    /// Signed POST of `body` to `to`.
    pub async fn post(&self, body: Vec<u8>, to: &str) -> Result<reqwest::Response, AppError> {
        let request = self.signed_request(reqwest::Method::POST, to, body)?;
        self.send(request, to).await
    }

    /// Signed GET of `to`.
    pub async fn get(&self, to: &str) -> Result<reqwest::Response, AppError> {
        let request = self.signed_request(reqwest::Method::GET, to, Vec::new())?;
        self.send(request, to).await
    }

    /// Signed GET returning the body of a 200 response.
    ///
    /// # Errors
    /// - `Federation` for non-200 responses or bodies over `max_size`
    /// - `Timeout` when the remote does not answer in time
    pub async fn get_body(&self, uri: &str) -> Result<Vec<u8>, AppError> {
        let mut response = self.get(uri).await?;
        tracing::debug!(status = %response.status(), "Client: got status");
        if response.status() != reqwest::StatusCode::OK {
            return Err(AppError::Federation(format!(
                "got non 200 status code for id: {uri}"
            )));
        }

        let max_size = self.settings.max_size;
        if response
            .content_length()
            .is_some_and(|len| len > max_size as u64)
        {
            return Err(AppError::Federation(format!(
                "response body of {uri} exceeds {max_size} bytes"
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(uri.to_string())
            } else {
                AppError::HttpClient(e)
            }
        })? {
            if body.len() + chunk.len() > max_size {
                return Err(AppError::Federation(format!(
                    "response body of {uri} exceeds {max_size} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            body = %char_limiter(&String::from_utf8_lossy(&body), 120),
            "Client: got body"
        );
        Ok(body)
    }

    /// [`ApClient::get_body`] that gives up when `cancel` fires.
    pub async fn get_body_cancellable(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AppError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled(uri.to_string())),
            result = self.get_body(uri) => result,
        }
    }

    /// [`ApClient::post`] that gives up when `cancel` fires.
    pub async fn post_cancellable(
        &self,
        body: Vec<u8>,
        to: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, AppError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled(to.to_string())),
            result = self.post(body, to) => result,
        }
    }
}
