//! Commit and tag signature verification against registered keys

use std::collections::HashMap;
use std::sync::Arc;

use super::gpg::verify_gpg;
use super::keys::{GpgKey, KeyStore, SshPublicKey, User};
use super::object::GitObject;
use super::ssh::verify_ssh;
use super::trust::{TrustModel, TrustStatus, calculate_trust_status};
use crate::error::AppError;
use crate::metrics::OBJECT_VERIFICATIONS_TOTAL;

/// Reason of an object without signature.
pub const NOT_SIGNED: &str = "gpg.error.not_signed_commit";

/// Reason of every failed verification. Wrong keys, unknown committers and
/// malformed signatures all share it.
pub const NO_KEY_FOUND: &str = "gpg.error.no_gpg_keys_found";

const SSH_ARMOR: &str = "-----BEGIN SSH SIGNATURE-----";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Gpg,
    Ssh,
}

impl SignatureKind {
    pub fn detect(armor: &str) -> Self {
        if armor.trim_start().starts_with(SSH_ARMOR) {
            Self::Ssh
        } else {
            Self::Gpg
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpg => "gpg",
            Self::Ssh => "ssh",
        }
    }
}

/// Key that produced a verified signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningKey {
    Gpg {
        key: GpgKey,
        /// Id of the (sub)key that signed
        signed_by: String,
    },
    Ssh(SshPublicKey),
}

impl SigningKey {
    /// Stable id used to cache trust decisions per key.
    pub fn cache_id(&self) -> String {
        match self {
            Self::Gpg { signed_by, .. } => signed_by.clone(),
            Self::Ssh(key) => key.fingerprint.clone(),
        }
    }
}

/// Outcome of verifying one git object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVerification {
    pub verified: bool,
    pub reason: String,
    pub committing_user: Option<User>,
    pub signing_user: Option<User>,
    pub signing_email: Option<String>,
    /// Email the object names as committer or tagger
    pub committing_email: Option<String>,
    pub signing_key: Option<SigningKey>,
    /// Set by [`super::calculate_trust_status`]
    pub trust_status: Option<TrustStatus>,
}

impl ObjectVerification {
    fn failed(reason: &str, committing_user: Option<User>) -> Self {
        Self {
            verified: false,
            reason: reason.to_string(),
            committing_user,
            ..Self::default()
        }
    }
}

/// Verifies signed git objects against the keys of their committer.
#[derive(Clone)]
pub struct ObjectVerifier {
    store: Arc<dyn KeyStore>,
    no_reply_address: String,
}

impl ObjectVerifier {
    pub fn new(store: Arc<dyn KeyStore>, no_reply_address: impl Into<String>) -> Self {
        Self {
            store,
            no_reply_address: no_reply_address.into().to_lowercase(),
        }
    }

    /// Verify the signature of `object`.
    ///
    /// Never fails: lookup errors are logged and reported as
    /// [`NO_KEY_FOUND`], like any other negative result.
    pub async fn parse_object_with_signature(&self, object: &GitObject) -> ObjectVerification {
        let Some(signature) = &object.signature else {
            return ObjectVerification::failed(NOT_SIGNED, None);
        };
        let kind = SignatureKind::detect(&signature.signature);

        let verification = match self.verify(object, kind).await {
            Ok(verification) => verification,
            Err(e) => {
                tracing::warn!(error = %e, "Key lookup failed during object verification");
                ObjectVerification::failed(NO_KEY_FOUND, None)
            }
        };

        OBJECT_VERIFICATIONS_TOTAL
            .with_label_values(&[kind.as_str(), if verification.verified { "true" } else { "false" }])
            .inc();
        verification
    }

    /// Verify every object and classify the verified ones under `model`.
    ///
    /// Membership answers are shared across the batch per signing key.
    /// Errors of `is_owner_member_collaborator` only downgrade trust.
    pub async fn parse_commits_with_signature<F>(
        &self,
        objects: &[GitObject],
        model: TrustModel,
        mut is_owner_member_collaborator: F,
    ) -> Vec<ObjectVerification>
    where
        F: FnMut(&User) -> Result<bool, AppError>,
    {
        let mut key_map = HashMap::new();
        let mut verifications = Vec::with_capacity(objects.len());

        for object in objects {
            let mut verification = self.parse_object_with_signature(object).await;
            calculate_trust_status(
                &mut verification,
                model,
                &mut is_owner_member_collaborator,
                &mut key_map,
            );
            verifications.push(verification);
        }

        verifications
    }

    async fn verify(
        &self,
        object: &GitObject,
        kind: SignatureKind,
    ) -> Result<ObjectVerification, AppError> {
        let (Some(signature), Some(email)) = (&object.signature, &object.committer_email) else {
            return Ok(ObjectVerification::failed(NO_KEY_FOUND, None));
        };

        let Some(committer) = self.resolve_committer(email).await? else {
            return Ok(ObjectVerification::failed(NO_KEY_FOUND, None));
        };

        let activated = email.eq_ignore_ascii_case(&committer.no_reply_email(&self.no_reply_address))
            || self
                .store
                .email_addresses(committer.id)
                .await?
                .iter()
                .any(|e| e.is_activated && e.email.eq_ignore_ascii_case(email));

        let payload = signature.payload.as_bytes();
        let armor = signature.signature.as_str();

        let matched = match kind {
            SignatureKind::Ssh => self
                .store
                .ssh_keys(committer.id)
                .await?
                .into_iter()
                .filter(|key| key.verified && activated)
                .find(|key| verify_ssh(payload, armor, key).is_ok())
                .map(|key| (key.fingerprint.clone(), SigningKey::Ssh(key))),
            SignatureKind::Gpg => self
                .store
                .gpg_keys(committer.id)
                .await?
                .into_iter()
                .filter(|key| {
                    key.verified
                        && (activated
                            || key
                                .emails
                                .iter()
                                .any(|e| e.is_activated && e.email.eq_ignore_ascii_case(email)))
                })
                .find_map(|key| {
                    let signed_by = verify_gpg(payload, armor, &key).ok()?;
                    Some((signed_by.clone(), SigningKey::Gpg { key, signed_by }))
                }),
        };

        Ok(match matched {
            Some((key_name, signing_key)) => ObjectVerification {
                verified: true,
                reason: format!("{} / {}", committer.name, key_name),
                committing_user: Some(committer.clone()),
                signing_user: Some(committer),
                signing_email: Some(email.clone()),
                committing_email: Some(email.clone()),
                signing_key: Some(signing_key),
                trust_status: None,
            },
            None => ObjectVerification::failed(NO_KEY_FOUND, Some(committer)),
        })
    }

    /// User with `email` activated, or the owner of the no-reply address.
    async fn resolve_committer(&self, email: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.store.get_user_by_email(email).await? {
            return Ok(Some(user));
        }

        let lower = email.to_lowercase();
        match lower.rsplit_once('@') {
            Some((name, domain)) if domain == self.no_reply_address => {
                self.store.get_user_by_name(name).await
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asymkey::keys::{EmailAddress, MemoryKeyStore};
    use crate::asymkey::object::ObjectSignature;
    use crate::asymkey::test_vectors::*;

    fn user2() -> User {
        User {
            id: 2,
            name: "user2".to_string(),
            email: "user2@example.com".to_string(),
        }
    }

    async fn store() -> Arc<MemoryKeyStore> {
        let store = MemoryKeyStore::new();
        store.add_user(user2()).await;
        store
            .add_user(User {
                id: 1,
                name: "user1".to_string(),
                email: "user1@example.com".to_string(),
            })
            .await;
        store
            .add_ssh_key(SshPublicKey::new(1000, 2, SSH_PUBLIC_KEY, true).unwrap())
            .await;
        store
            .add_gpg_key(GpgKey::new(7, 2, GPG_PUBLIC_KEY, Vec::new(), true).unwrap())
            .await;
        Arc::new(store)
    }

    fn object(email: &str, payload: &str, signature: &str) -> GitObject {
        GitObject {
            committer_email: Some(email.to_string()),
            signature: Some(ObjectSignature {
                payload: payload.to_string(),
                signature: signature.to_string(),
            }),
        }
    }

    async fn verifier() -> ObjectVerifier {
        ObjectVerifier::new(store().await, "noreply.example.com")
    }

    /// `original` with the first `from` replaced by `to`.
    fn mutate(original: &str, from: &str, to: &str) -> String {
        assert_eq!(from.len(), to.len());
        let mutated = original.replacen(from, to, 1);
        assert_ne!(mutated, original);
        mutated
    }

    async fn assert_rejected(payload: &str, signature: &str) {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object("user2@example.com", payload, signature))
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[test]
    fn signature_kind_follows_armor() {
        assert_eq!(SignatureKind::detect(COMMIT_SSH_SIGNATURE), SignatureKind::Ssh);
        assert_eq!(SignatureKind::detect(COMMIT_GPG_SIGNATURE), SignatureKind::Gpg);
        assert_eq!(SignatureKind::detect("garbage"), SignatureKind::Gpg);
    }

    #[tokio::test]
    async fn unsigned_object() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&GitObject::default())
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NOT_SIGNED);
    }

    #[tokio::test]
    async fn no_committer() {
        let mut object = object("", COMMIT_PAYLOAD, COMMIT_SSH_SIGNATURE);
        object.committer_email = None;
        let verification = verifier().await.parse_object_with_signature(&object).await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn committer_without_keys() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "user1@example.com",
                COMMIT_PAYLOAD,
                COMMIT_SSH_SIGNATURE,
            ))
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn correct_signature_with_unknown_email() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "non-existent",
                COMMIT_PAYLOAD,
                COMMIT_SSH_SIGNATURE,
            ))
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn broken_signature_with_correct_email() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "user2@example.com",
                COMMIT_PAYLOAD,
                "-----BEGIN SSH SIGNATURE-----",
            ))
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn valid_ssh_signature() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "user2@example.com",
                COMMIT_PAYLOAD,
                COMMIT_SSH_SIGNATURE,
            ))
            .await;
        assert!(verification.verified);
        assert_eq!(verification.reason, format!("user2 / {SSH_FINGERPRINT}"));
        assert_eq!(verification.signing_user, Some(user2()));
        assert!(matches!(
            verification.signing_key,
            Some(SigningKey::Ssh(ref key)) if key.id == 1000
        ));
    }

    #[tokio::test]
    async fn valid_ssh_signature_with_noreply_email() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "user2@noreply.example.com",
                NOREPLY_PAYLOAD,
                NOREPLY_SSH_SIGNATURE,
            ))
            .await;
        assert!(verification.verified);
        assert_eq!(verification.reason, format!("user2 / {SSH_FINGERPRINT}"));
    }

    #[tokio::test]
    async fn unverified_keys_are_ignored() {
        let store = MemoryKeyStore::new();
        store.add_user(user2()).await;
        store
            .add_ssh_key(SshPublicKey::new(1000, 2, SSH_PUBLIC_KEY, false).unwrap())
            .await;
        let verifier = ObjectVerifier::new(Arc::new(store), "noreply.example.com");

        let verification = verifier
            .parse_object_with_signature(&object(
                "user2@example.com",
                COMMIT_PAYLOAD,
                COMMIT_SSH_SIGNATURE,
            ))
            .await;
        assert!(!verification.verified);
        assert_eq!(verification.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn valid_gpg_signature() {
        let verification = verifier()
            .await
            .parse_object_with_signature(&object(
                "user2@example.com",
                COMMIT_PAYLOAD,
                COMMIT_GPG_SIGNATURE,
            ))
            .await;
        assert!(verification.verified);
        assert_eq!(verification.reason, format!("user2 / {GPG_KEY_ID}"));
        assert_eq!(verification.signing_email.as_deref(), Some("user2@example.com"));
    }

    #[tokio::test]
    async fn valid_gpg_tag_signature_by_subkey() {
        let store = MemoryKeyStore::new();
        store
            .add_user(User {
                id: 5,
                name: "user5".to_string(),
                email: "user5@example.com".to_string(),
            })
            .await;
        store
            .add_email(EmailAddress {
                owner_id: 5,
                email: "old@example.com".to_string(),
                is_activated: false,
            })
            .await;
        store
            .add_gpg_key(GpgKey::new(9, 5, GPG_SUBKEY_PUBLIC_KEY, Vec::new(), true).unwrap())
            .await;
        let verifier = ObjectVerifier::new(Arc::new(store), "noreply.example.com");

        let raw = format!("{TAG_PAYLOAD}{TAG_GPG_SIGNATURE}");
        let verification = verifier
            .parse_object_with_signature(&GitObject::from_tag(&raw))
            .await;
        assert!(verification.verified);
        assert_eq!(verification.reason, format!("user5 / {GPG_SIGNING_SUBKEY_ID}"));

        let inactive = verifier
            .parse_object_with_signature(&object("old@example.com", TAG_PAYLOAD, TAG_GPG_SIGNATURE))
            .await;
        assert!(!inactive.verified);
        assert_eq!(inactive.reason, NO_KEY_FOUND);
    }

    #[tokio::test]
    async fn ssh_signature_over_mutated_payload() {
        assert_rejected(
            &mutate(COMMIT_PAYLOAD, "Add content", "Add contenu"),
            COMMIT_SSH_SIGNATURE,
        )
        .await;
    }

    #[tokio::test]
    async fn mutated_ssh_signature() {
        assert_rejected(
            COMMIT_PAYLOAD,
            &mutate(COMMIT_SSH_SIGNATURE, "fs9cMpZVM9", "fs9cMpZWM9"),
        )
        .await;
    }

    #[tokio::test]
    async fn gpg_signature_over_mutated_payload() {
        assert_rejected(
            &mutate(COMMIT_PAYLOAD, "1699707877 +0100\n\n", "1699707878 +0100\n\n"),
            COMMIT_GPG_SIGNATURE,
        )
        .await;
    }

    #[tokio::test]
    async fn mutated_gpg_signature() {
        assert_rejected(
            COMMIT_PAYLOAD,
            &mutate(COMMIT_GPG_SIGNATURE, "lxSm7sKH", "lxSm7tKH"),
        )
        .await;
    }

    #[tokio::test]
    async fn batch_classifies_verified_objects() {
        let objects = [
            object("user2@example.com", COMMIT_PAYLOAD, COMMIT_SSH_SIGNATURE),
            object("user2@example.com", COMMIT_PAYLOAD, COMMIT_GPG_SIGNATURE),
            GitObject::default(),
        ];
        let mut calls = 0;

        let verifications = verifier()
            .await
            .parse_commits_with_signature(&objects, TrustModel::Collaborator, |user| {
                calls += 1;
                Ok(user.id == 2)
            })
            .await;

        assert_eq!(verifications.len(), 3);
        assert_eq!(verifications[0].trust_status, Some(TrustStatus::Trusted));
        assert_eq!(verifications[1].trust_status, Some(TrustStatus::Trusted));
        assert_eq!(verifications[2].trust_status, None);
        assert_eq!(verifications[2].reason, NOT_SIGNED);
        // one lookup per signing key
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn batch_treats_failing_membership_check_as_untrusted() {
        let objects = [
            object("user2@example.com", COMMIT_PAYLOAD, COMMIT_SSH_SIGNATURE),
            object("user2@example.com", COMMIT_PAYLOAD, COMMIT_SSH_SIGNATURE),
        ];

        let verifications = verifier()
            .await
            .parse_commits_with_signature(&objects, TrustModel::Collaborator, |_| {
                Err(AppError::Internal(anyhow::anyhow!("membership lookup failed")))
            })
            .await;

        assert_eq!(verifications.len(), 2);
        for verification in &verifications {
            assert!(verification.verified);
            assert_eq!(verification.trust_status, Some(TrustStatus::Untrusted));
        }
    }
}
