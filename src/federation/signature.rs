//! HTTP Signatures
//!
//! Signing and verification of federation requests (draft-cavage HTTP
//! signatures with RSA PKCS#1 v1.5 and a body `Digest`).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature as Pkcs1v15Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha512};
use url::Url;

use crate::error::AppError;

/// Content type of every federation request we send.
pub const ACTIVITY_STREAMS_CONTENT_TYPE: &str =
    r#"application/ld+json; profile="https://www.w3.org/ns/activitystreams""#;

/// Lifetime of an outbound signature in seconds.
pub const SIGNATURE_EXPIRATION_SECS: i64 = 60;

/// Accepted clock skew for the `Date` header of inbound requests.
pub const MAX_DATE_SKEW_SECS: i64 = 300;

pub const REQUEST_TARGET: &str = "(request-target)";

/// RFC 1123 date with the `GMT` zone name HTTP requires.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Signature algorithm of the `Signature` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    RsaSha256,
    RsaSha512,
}

impl SignatureAlgorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            // hs2019 leaves the hash to the key; RSA keys in the fediverse use SHA-256.
            "rsa-sha256" | "hs2019" => Some(Self::RsaSha256),
            "rsa-sha512" => Some(Self::RsaSha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsaSha256 => "rsa-sha256",
            Self::RsaSha512 => "rsa-sha512",
        }
    }
}

/// Hash used for the `Digest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SHA-256" => Some(Self::Sha256),
            "SHA-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// `Digest` header value, e.g. `SHA-256=base64(hash)`
    pub fn digest(&self, body: &[u8]) -> String {
        let hash = match self {
            Self::Sha256 => BASE64.encode(Sha256::digest(body)),
            Self::Sha512 => BASE64.encode(Sha512::digest(body)),
        };
        format!("{}={}", self.as_str(), hash)
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, AppError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| AppError::Config(format!("Invalid private key: {}", e)))
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, AppError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| AppError::Validation(format!("Invalid public key: {}", e)))
}

fn request_target(method: &str, path_and_query: &str) -> String {
    format!("{} {}", method.to_lowercase(), path_and_query)
}

/// Headers to add for signed request
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    /// Signature header value
    pub signature: String,
    /// Date header value (RFC 1123, GMT)
    pub date: String,
    /// Digest header value (if signed)
    pub digest: Option<String>,
}

/// Signs outbound requests with the instance actor key.
pub struct RequestSigner {
    signing_key: RsaPrivateKey,
    key_id: String,
    algorithm: SignatureAlgorithm,
    digest_algorithm: DigestAlgorithm,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("digest_algorithm", &self.digest_algorithm)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// # Arguments
    /// * `private_key_pem` - RSA private key, PKCS#8 or PKCS#1 PEM
    /// * `key_id` - Full URL to the public key (`{actor}#main-key`)
    pub fn new(
        private_key_pem: &str,
        key_id: impl Into<String>,
        algorithm: SignatureAlgorithm,
        digest_algorithm: DigestAlgorithm,
    ) -> Result<Self, AppError> {
        Ok(Self {
            signing_key: parse_private_key(private_key_pem)?,
            key_id: key_id.into(),
            algorithm,
            digest_algorithm,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign a request covering `header_names`.
    ///
    /// `Date` and `Digest` are produced here; `host` is taken from `url`.
    /// Any other listed header must be present in `extra`.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        header_names: &[String],
        extra: &http::HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignatureHeaders, AppError> {
        let date = http_date(now);
        let created = now.timestamp();
        let expires = created + SIGNATURE_EXPIRATION_SECS;

        let signs_digest = header_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case("digest"));
        let digest = signs_digest.then(|| self.digest_algorithm.digest(body));

        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let authority = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
            None => url.host_str().unwrap_or_default().to_string(),
        };

        let mut signing_parts = Vec::with_capacity(header_names.len());
        let mut listed = Vec::with_capacity(header_names.len());
        for name in header_names {
            let name = name.to_ascii_lowercase();
            let value = match name.as_str() {
                REQUEST_TARGET => request_target(method, &path_and_query),
                "(created)" => created.to_string(),
                "(expires)" => expires.to_string(),
                "host" => authority.clone(),
                "date" => date.clone(),
                "digest" => digest.clone().unwrap_or_default(),
                other => extra
                    .get(other)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        AppError::Config(format!("missing value for signed header: {other}"))
                    })?
                    .to_string(),
            };
            signing_parts.push(format!("{name}: {value}"));
            listed.push(name);
        }
        let signing_string = signing_parts.join("\n");

        let signature = match self.algorithm {
            SignatureAlgorithm::RsaSha256 => {
                SigningKey::<Sha256>::new(self.signing_key.clone())
                    .sign(signing_string.as_bytes())
                    .to_bytes()
            }
            SignatureAlgorithm::RsaSha512 => {
                SigningKey::<Sha512>::new(self.signing_key.clone())
                    .sign(signing_string.as_bytes())
                    .to_bytes()
            }
        };

        let signature_header = format!(
            "keyId=\"{}\",algorithm=\"{}\",created={},expires={},headers=\"{}\",signature=\"{}\"",
            self.key_id,
            self.algorithm.as_str(),
            created,
            expires,
            listed.join(" "),
            BASE64.encode(signature)
        );

        Ok(SignatureHeaders {
            signature: signature_header,
            date,
            digest,
        })
    }
}

/// Parsed Signature header
#[derive(Debug, Clone)]
pub struct ParsedSignature {
    /// Key ID (URL to public key)
    pub key_id: String,
    /// Algorithm, `hs2019` when absent
    pub algorithm: String,
    /// Signed header names, lowercased
    pub headers: Vec<String>,
    /// Base64-encoded signature
    pub signature: String,
    pub created: Option<i64>,
    pub expires: Option<i64>,
}

/// Parse Signature header value
///
/// # Format
/// ```text
/// keyId="...",algorithm="...",headers="...",signature="..."
/// ```
pub fn parse_signature_header(header: &str) -> Result<ParsedSignature, AppError> {
    let mut key_id = None;
    let mut algorithm = None;
    let mut headers = None;
    let mut signature = None;
    let mut created = None;
    let mut expires = None;

    for part in header.split(',') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');

            match key.trim() {
                "keyId" => key_id = Some(value.to_string()),
                "algorithm" => algorithm = Some(value.to_string()),
                "headers" => {
                    headers = Some(
                        value
                            .split_whitespace()
                            .map(|s| s.to_ascii_lowercase())
                            .collect(),
                    )
                }
                "signature" => signature = Some(value.to_string()),
                "created" => created = value.parse().ok(),
                "expires" => expires = value.parse().ok(),
                _ => {}
            }
        }
    }

    Ok(ParsedSignature {
        key_id: key_id.ok_or_else(|| AppError::Validation("Missing keyId".to_string()))?,
        algorithm: algorithm.unwrap_or_else(|| "hs2019".to_string()),
        // Absent list means only `date` is signed.
        headers: headers.unwrap_or_else(|| vec!["date".to_string()]),
        signature: signature
            .ok_or_else(|| AppError::Validation("Missing signature".to_string()))?,
        created,
        expires,
    })
}

/// Extract keyId from Signature header.
pub fn extract_signature_key_id(headers: &http::HeaderMap) -> Result<String, AppError> {
    let signature_header = signature_header(headers)?;
    Ok(parse_signature_header(signature_header)?.key_id)
}

fn signature_header(headers: &http::HeaderMap) -> Result<&str, AppError> {
    headers
        .get("signature")
        .ok_or_else(|| AppError::Validation("Missing Signature header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Validation("Invalid Signature header".to_string()))
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .ok_or_else(|| AppError::Validation(format!("Missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Validation(format!("Invalid {name} header")))
}

/// Verify an HTTP request signature
///
/// # Arguments
/// * `method` - HTTP method
/// * `path_and_query` - Request path including query
/// * `headers` - All request headers
/// * `body` - Request body (for digest verification)
/// * `public_key_pem` - RSA public key in PEM format
///
/// # Errors
/// - `Validation` for malformed, stale or incomplete signatures
/// - `InvalidSignature` if the signature does not match the key
pub fn verify_signature(
    method: &str,
    path_and_query: &str,
    headers: &http::HeaderMap,
    body: &[u8],
    public_key_pem: &str,
) -> Result<(), AppError> {
    verify_signature_at(method, path_and_query, headers, body, public_key_pem, Utc::now())
}

pub(crate) fn verify_signature_at(
    method: &str,
    path_and_query: &str,
    headers: &http::HeaderMap,
    body: &[u8],
    public_key_pem: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let parsed = parse_signature_header(signature_header(headers)?)?;

    // 1. Validate algorithm and required signed headers.
    let algorithm = SignatureAlgorithm::parse(&parsed.algorithm).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported signature algorithm: {}",
            parsed.algorithm
        ))
    })?;

    let mut required = vec![REQUEST_TARGET, "date"];
    if !method.eq_ignore_ascii_case("GET") || !body.is_empty() {
        required.push("digest");
    }
    for header in required {
        if !parsed.headers.iter().any(|h| h == header) {
            return Err(AppError::Validation(format!(
                "Signed headers must include: {}",
                header
            )));
        }
    }

    // 2. Expiry and Date freshness.
    if parsed.expires.is_some_and(|expires| expires < now.timestamp()) {
        return Err(AppError::Validation("Signature expired".to_string()));
    }

    let date = DateTime::parse_from_rfc2822(header_str(headers, "date")?)
        .map_err(|_| AppError::Validation("Invalid Date format".to_string()))?;
    if (now.timestamp() - date.timestamp()).abs() > MAX_DATE_SKEW_SECS {
        return Err(AppError::Validation(
            "Date header too old or in future".to_string(),
        ));
    }

    // 3. Digest must match the body.
    if parsed.headers.iter().any(|h| h == "digest") {
        let digest = header_str(headers, "digest")?;
        let (name, _) = digest
            .split_once('=')
            .ok_or_else(|| AppError::Validation("Invalid Digest header".to_string()))?;
        let digest_algorithm = DigestAlgorithm::parse(name).ok_or_else(|| {
            AppError::Validation(format!("Unsupported digest algorithm: {}", name))
        })?;
        if digest_algorithm.digest(body) != digest {
            return Err(AppError::Validation("Digest mismatch".to_string()));
        }
    }

    // 4. Reconstruct signing string.
    let mut signing_parts = Vec::with_capacity(parsed.headers.len());
    for name in &parsed.headers {
        let value = match name.as_str() {
            REQUEST_TARGET => request_target(method, path_and_query),
            "(created)" => parsed
                .created
                .ok_or_else(|| AppError::Validation("Missing created parameter".to_string()))?
                .to_string(),
            "(expires)" => parsed
                .expires
                .ok_or_else(|| AppError::Validation("Missing expires parameter".to_string()))?
                .to_string(),
            other => header_str(headers, other)?.to_string(),
        };
        signing_parts.push(format!("{}: {}", name, value));
    }
    let signing_string = signing_parts.join("\n");

    // 5. Verify RSA signature.
    let signature_bytes = BASE64
        .decode(&parsed.signature)
        .map_err(|_| AppError::Validation("Invalid signature encoding".to_string()))?;
    let signature = Pkcs1v15Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| AppError::Validation(format!("Invalid signature format: {}", e)))?;
    let public_key = parse_public_key(public_key_pem)?;

    let verified = match algorithm {
        SignatureAlgorithm::RsaSha256 => VerifyingKey::<Sha256>::new(public_key)
            .verify(signing_string.as_bytes(), &signature),
        SignatureAlgorithm::RsaSha512 => VerifyingKey::<Sha512>::new(public_key)
            .verify(signing_string.as_bytes(), &signature),
    };
    verified.map_err(|_| AppError::InvalidSignature)
}
