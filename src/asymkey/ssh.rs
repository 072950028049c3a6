//! SSHSIG verification

use ssh_key::{PublicKey, SshSig};

use super::keys::SshPublicKey;
use crate::error::AppError;

/// Namespace git uses when signing objects with SSH keys.
pub const GIT_NAMESPACE: &str = "git";

/// Verify an armored SSH signature over `payload` with `key`.
///
/// # Errors
/// - `Validation` if the armor or the key cannot be parsed
/// - `InvalidSignature` if the signature was not made by `key` over
///   `payload` in the `git` namespace
pub fn verify_ssh(payload: &[u8], armor: &str, key: &SshPublicKey) -> Result<(), AppError> {
    let signature = SshSig::from_pem(armor)
        .map_err(|e| AppError::Validation(format!("Invalid SSH signature: {e}")))?;
    let public_key = PublicKey::from_openssh(&key.content)
        .map_err(|e| AppError::Validation(format!("Invalid SSH public key: {e}")))?;

    public_key
        .verify(GIT_NAMESPACE, payload, &signature)
        .map_err(|_| AppError::InvalidSignature)
}
