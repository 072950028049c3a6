//! ActivityPub federation module
//!
//! Handles:
//! - HTTP Signatures
//! - Signed outbound requests
//! - Federation host discovery (NodeInfo)
//! - Like processing and delivery
//! - Public key caching

mod client;
mod delivery;
mod key_cache;
mod resolver;
mod service;
pub mod signature;

pub use client::{ApClient, HttpSignatureSettings, REQUEST_TIMEOUT, char_limiter};
pub use delivery::{ActivityDelivery, DeliveryResult};
pub use key_cache::{CacheStats, PublicKeyCache, fetch_public_key};
pub use resolver::FederationHostResolver;
pub use service::FederationService;
pub use signature::{
    extract_signature_key_id, parse_signature_header, verify_signature,
};
