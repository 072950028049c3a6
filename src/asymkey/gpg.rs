//! OpenPGP detached signature verification

use pgp::types::PublicKeyTrait;
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};

use super::keys::GpgKey;
use crate::error::AppError;

/// Verify an armored detached signature over `payload` with `key`.
///
/// The primary key is tried first, then every subkey.
///
/// # Returns
/// Upper case hex id of the (sub)key that made the signature.
///
/// # Errors
/// - `Validation` if the armor or the key cannot be parsed
/// - `InvalidSignature` if no key of `key` made the signature
pub fn verify_gpg(payload: &[u8], armor: &str, key: &GpgKey) -> Result<String, AppError> {
    let (signature, _headers) = StandaloneSignature::from_string(armor)
        .map_err(|e| AppError::Validation(format!("Invalid GPG signature: {e}")))?;
    let (public_key, _headers) = SignedPublicKey::from_string(&key.content)
        .map_err(|e| AppError::Validation(format!("Invalid GPG public key: {e}")))?;

    if signature.verify(&public_key, payload).is_ok() {
        return Ok(hex::encode_upper(public_key.key_id()));
    }

    public_key
        .public_subkeys
        .iter()
        .find(|subkey| signature.verify(*subkey, payload).is_ok())
        .map(|subkey| hex::encode_upper(subkey.key_id()))
        .ok_or(AppError::InvalidSignature)
}
