//! Commit and tag signatures
//!
//! Verifies GPG and SSH signatures on git objects against the keys users
//! registered, and classifies verified signatures by repository trust
//! model.

mod gpg;
mod keys;
mod object;
mod ssh;
mod trust;
mod verification;

#[cfg(test)]
pub(crate) mod test_vectors;

pub use gpg::verify_gpg;
pub use keys::{EmailAddress, GpgKey, KeyStore, MemoryKeyStore, SshPublicKey, User};
pub use object::{GitObject, ObjectSignature};
pub use ssh::{GIT_NAMESPACE, verify_ssh};
pub use trust::{TrustModel, TrustStatus, calculate_trust_status};
pub use verification::{
    NO_KEY_FOUND, NOT_SIGNED, ObjectVerification, ObjectVerifier, SignatureKind, SigningKey,
};
