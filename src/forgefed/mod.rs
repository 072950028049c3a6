//! ForgeFed vocabulary
//!
//! Value types exchanged between forges:
//! - Actor identities (person and repository IRIs)
//! - Activities (Like)
//! - NodeInfo discovery documents
//! - Actor documents

mod activity;
mod actor;
mod nodeinfo;
mod person;

pub use activity::{ForgeLike, InlineObject, IriOrObject, LIKE_TYPE, validate_like};
pub use actor::{ActorId, KNOWN_SOURCE_SOFTWARE, PersonId, RepositoryId, SourceSoftware};
pub use nodeinfo::{NodeInfo, NodeInfoIndex, NodeInfoLink, NodeInfoWellKnown};
pub use person::{ForgePerson, PublicKeyInfo};
