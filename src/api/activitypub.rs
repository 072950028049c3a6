//! ActivityPub endpoints
//!
//! - Instance actor document
//! - Instance actor inbox
//! - Repository inbox (ForgeFed Like)

use axum::body::Bytes;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::Json,
    routing::{get, post},
};

use crate::AppState;
use crate::api::metrics::{record_request, request_timer};
use crate::error::AppError;
use crate::federation::{extract_signature_key_id, verify_signature};
use crate::forgefed::{ForgeLike, LIKE_TYPE, validate_like};
use crate::metrics::{
    ACTIVITIES_RECEIVED_TOTAL, FEDERATION_REQUEST_DURATION_SECONDS, FEDERATION_REQUESTS_TOTAL,
};
use crate::validation::NotValid;

pub const ACTOR_PATH: &str = "/api/v1/activitypub/actor";
const REPOSITORY_INBOX_ENDPOINT: &str = "/api/v1/activitypub/repository-id/:id/inbox";

/// Routes:
/// - GET /api/v1/activitypub/actor - Instance actor
/// - POST /api/v1/activitypub/actor/inbox - Instance actor inbox
/// - POST /api/v1/activitypub/repository-id/:id/inbox - Repository inbox
pub fn activitypub_router() -> Router<AppState> {
    Router::new()
        .route(ACTOR_PATH, get(actor))
        .route("/api/v1/activitypub/actor/inbox", post(actor_inbox))
        .route(REPOSITORY_INBOX_ENDPOINT, post(repository_inbox))
        .route("/api/v1/activitypub/repository-id/:id/inbox/", post(repository_inbox))
}

/// GET /api/v1/activitypub/actor
///
/// The instance actor every outbound request is signed as.
///
/// Content-Type: application/activity+json
async fn actor(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let _timer = request_timer("GET", ACTOR_PATH);
    if !state.config.federation.enabled {
        return Err(AppError::NotFound);
    }

    let actor_url = state.actor_uri();
    let response = Json(serde_json::json!({
        "@context": [
            "https://www.w3.org/ns/activitystreams",
            "https://w3id.org/security/v1"
        ],
        "type": "Application",
        "id": actor_url.clone(),
        "preferredUsername": state.config.server.domain,
        "inbox": format!("{actor_url}/inbox"),
        "outbox": format!("{actor_url}/outbox"),
        "url": state.config.server.base_url(),
        "publicKey": {
            "id": format!("{actor_url}#main-key"),
            "owner": actor_url,
            "publicKeyPem": state.instance_public_key_pem.as_str()
        }
    }));

    record_request("GET", ACTOR_PATH, StatusCode::OK);
    Ok(response)
}

/// Check the request signature against the signer's published key.
///
/// A failed check is retried once with a freshly fetched key, in case the
/// remote actor rotated it since it was cached.
///
/// # Returns
/// The `keyId` the request was signed with.
async fn verify_inbound(
    state: &AppState,
    method: &str,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<String, AppError> {
    if headers.get("signature").is_none() {
        FEDERATION_REQUESTS_TOTAL
            .with_label_values(&["inbound", "unauthorized"])
            .inc();
        return Err(AppError::InvalidSignature);
    }

    let key_id = extract_signature_key_id(headers)?;
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let public_key_pem = state.key_cache.get(&key_id).await?;
    let verified = match verify_signature(method, path_and_query, headers, body, &public_key_pem)
    {
        Err(AppError::InvalidSignature) => {
            tracing::debug!(key_id = %key_id, "Signature mismatch, refetching key");
            state.key_cache.invalidate(&key_id).await;
            let public_key_pem = state.key_cache.get(&key_id).await?;
            verify_signature(method, path_and_query, headers, body, &public_key_pem)
        }
        result => result,
    };

    if let Err(e) = verified {
        tracing::warn!(key_id = %key_id, error = %e, "Rejected inbound signature");
        FEDERATION_REQUESTS_TOTAL
            .with_label_values(&["inbound", "unauthorized"])
            .inc();
        return Err(e);
    }

    Ok(key_id)
}

/// POST /api/v1/activitypub/actor/inbox
///
/// Nothing is addressed to the instance actor yet; signed requests are
/// acknowledged and dropped.
async fn actor_inbox(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let _timer = request_timer("POST", "/api/v1/activitypub/actor/inbox");
    if !state.config.federation.enabled {
        return Err(AppError::NotFound);
    }

    let key_id = verify_inbound(&state, "POST", &uri, &headers, &body).await?;
    tracing::debug!(key_id = %key_id, "Instance actor inbox request accepted");

    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&["inbound", "success"])
        .inc();
    record_request(
        "POST",
        "/api/v1/activitypub/actor/inbox",
        StatusCode::NO_CONTENT,
    );
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/activitypub/repository-id/:id/inbox
///
/// Receives federated stars.
///
/// # Steps
/// 1. Verify HTTP Signature
/// 2. Validate the Like
/// 3. Hand it to the federation service
async fn repository_inbox(
    State(state): State<AppState>,
    Path(repository_id): Path<i64>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let _timer = request_timer("POST", REPOSITORY_INBOX_ENDPOINT);
    let _fed_timer = FEDERATION_REQUEST_DURATION_SECONDS
        .with_label_values(&["inbound"])
        .start_timer();
    if !state.config.federation.enabled {
        return Err(AppError::NotFound);
    }

    verify_inbound(&state, "POST", &uri, &headers, &body).await?;

    let violations = validate_like(&body);
    if !violations.is_empty() {
        tracing::warn!(
            repository_id,
            violations = violations.len(),
            "Rejected invalid Like"
        );
        ACTIVITIES_RECEIVED_TOTAL
            .with_label_values(&[LIKE_TYPE, "rejected"])
            .inc();
        return Err(NotValid::new("ForgeLike", violations).into());
    }
    let like = ForgeLike::from_json(&body)?;

    match state
        .federation
        .process_like_activity(repository_id, &like)
        .await
    {
        Ok(()) => {
            ACTIVITIES_RECEIVED_TOTAL
                .with_label_values(&[LIKE_TYPE, "accepted"])
                .inc();
        }
        Err(e) => {
            tracing::warn!(repository_id, error = %e, "Like was not accepted");
            ACTIVITIES_RECEIVED_TOTAL
                .with_label_values(&[LIKE_TYPE, "rejected"])
                .inc();
            return Err(e);
        }
    }

    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&["inbound", "success"])
        .inc();
    record_request("POST", REPOSITORY_INBOX_ENDPOINT, StatusCode::NO_CONTENT);
    Ok(StatusCode::NO_CONTENT)
}
