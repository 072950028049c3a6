//! Discovery endpoints
//!
//! - /.well-known/nodeinfo
//! - /api/v1/nodeinfo

use axum::{Router, extract::State, response::Json, routing::get};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::AppError;

pub const NODEINFO_SCHEMA_REL: &str = "http://nodeinfo.diaspora.software/ns/schema/2.1";
pub const NODEINFO_PATH: &str = "/api/v1/nodeinfo";

/// Routes:
/// - GET /.well-known/nodeinfo
/// - GET /api/v1/nodeinfo
pub fn wellknown_router() -> Router<AppState> {
    Router::new()
        .route("/.well-known/nodeinfo", get(nodeinfo_links))
        .route(NODEINFO_PATH, get(nodeinfo))
}

/// GET /.well-known/nodeinfo
///
/// Index pointing at the NodeInfo document. Remote forges follow the first
/// link.
async fn nodeinfo_links(State(state): State<AppState>) -> Json<Value> {
    let base_url = state.config.server.base_url();
    Json(json!({
        "links": [
            {
                "href": format!("{base_url}{NODEINFO_PATH}"),
                "rel": NODEINFO_SCHEMA_REL
            }
        ]
    }))
}

/// GET /api/v1/nodeinfo
async fn nodeinfo(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let known_hosts = state.db.count_federation_hosts().await?;

    Ok(Json(json!({
        "version": "2.1",
        "software": {
            "name": state.config.federation.software_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "protocols": ["activitypub"],
        "services": {
            "inbound": [],
            "outbound": []
        },
        "openRegistrations": false,
        "usage": {
            "users": {}
        },
        "metadata": {
            "federation": {
                "enabled": state.config.federation.enabled,
                "knownHosts": known_hosts
            }
        }
    })))
}
