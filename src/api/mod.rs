//! API layer
//!
//! HTTP handlers for:
//! - ActivityPub (for federation)
//! - NodeInfo discovery
//! - Metrics (Prometheus)

mod activitypub;
pub mod metrics;
mod wellknown;

pub use activitypub::{ACTOR_PATH, activitypub_router};
pub use metrics::metrics_router;
pub use wellknown::{NODEINFO_PATH, wellknown_router};
