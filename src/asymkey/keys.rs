//! Users, email addresses and their public keys

use std::collections::HashMap;

use async_trait::async_trait;
use pgp::Deserializable;
use pgp::SignedPublicKey;
use pgp::types::PublicKeyTrait;
use ssh_key::HashAlg;
use tokio::sync::RwLock;

use crate::error::AppError;

/// Local account that can own keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Primary email
    pub email: String,
}

impl User {
    /// `{lower name}@{no_reply_address}`
    pub fn no_reply_email(&self, no_reply_address: &str) -> String {
        format!("{}@{}", self.name.to_lowercase(), no_reply_address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub owner_id: i64,
    pub email: String,
    pub is_activated: bool,
}

/// SSH public key registered by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshPublicKey {
    pub id: i64,
    pub owner_id: i64,
    /// OpenSSH encoded key (`ssh-ed25519 AAAA...`)
    pub content: String,
    /// `SHA256:...`
    pub fingerprint: String,
    /// Ownership was proven by the user
    pub verified: bool,
}

impl SshPublicKey {
    pub fn new(id: i64, owner_id: i64, content: &str, verified: bool) -> Result<Self, AppError> {
        let key = ssh_key::PublicKey::from_openssh(content.trim())
            .map_err(|e| AppError::Validation(format!("Invalid SSH public key: {e}")))?;

        Ok(Self {
            id,
            owner_id,
            content: content.trim().to_string(),
            fingerprint: key.fingerprint(HashAlg::Sha256).to_string(),
            verified,
        })
    }
}

/// OpenPGP public key registered by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgKey {
    pub id: i64,
    pub owner_id: i64,
    /// Upper case hex id of the primary key
    pub key_id: String,
    /// ASCII armored public key including subkeys
    pub content: String,
    /// Emails named in the key's user ids
    pub emails: Vec<EmailAddress>,
    pub verified: bool,
}

impl GpgKey {
    pub fn new(
        id: i64,
        owner_id: i64,
        armored: &str,
        emails: Vec<EmailAddress>,
        verified: bool,
    ) -> Result<Self, AppError> {
        let (key, _headers) = SignedPublicKey::from_string(armored)
            .map_err(|e| AppError::Validation(format!("Invalid GPG public key: {e}")))?;

        Ok(Self {
            id,
            owner_id,
            key_id: hex::encode_upper(key.key_id()),
            content: armored.to_string(),
            emails,
            verified,
        })
    }
}

/// Lookup of users and their keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// User owning `email` as an activated address.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, AppError>;

    async fn email_addresses(&self, owner_id: i64) -> Result<Vec<EmailAddress>, AppError>;

    async fn ssh_keys(&self, owner_id: i64) -> Result<Vec<SshPublicKey>, AppError>;

    async fn gpg_keys(&self, owner_id: i64) -> Result<Vec<GpgKey>, AppError>;
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    emails: Vec<EmailAddress>,
    ssh_keys: Vec<SshPublicKey>,
    gpg_keys: Vec<GpgKey>,
}

/// [`KeyStore`] kept in memory.
#[derive(Default)]
pub struct MemoryKeyStore {
    inner: RwLock<Inner>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user; the primary email is registered as activated.
    pub async fn add_user(&self, user: User) {
        let mut inner = self.inner.write().await;
        inner.emails.push(EmailAddress {
            owner_id: user.id,
            email: user.email.clone(),
            is_activated: true,
        });
        inner.users.insert(user.id, user);
    }

    pub async fn add_email(&self, email: EmailAddress) {
        self.inner.write().await.emails.push(email);
    }

    pub async fn add_ssh_key(&self, key: SshPublicKey) {
        self.inner.write().await.ssh_keys.push(key);
    }

    pub async fn add_gpg_key(&self, key: GpgKey) {
        self.inner.write().await.gpg_keys.push(key);
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .iter()
            .find(|e| e.is_activated && e.email.eq_ignore_ascii_case(email))
            .and_then(|e| inner.users.get(&e.owner_id))
            .cloned())
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn email_addresses(&self, owner_id: i64) -> Result<Vec<EmailAddress>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn ssh_keys(&self, owner_id: i64) -> Result<Vec<SshPublicKey>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ssh_keys
            .iter()
            .filter(|k| k.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn gpg_keys(&self, owner_id: i64) -> Result<Vec<GpgKey>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .gpg_keys
            .iter()
            .filter(|k| k.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
