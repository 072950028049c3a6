//! Actor documents exchanged between forges

use serde::{Deserialize, Serialize};

use crate::validation::{NotValid, Validate, is_valid, validate_not_empty, validate_one_of};

/// `publicKey` block of an actor document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub id: String,
    pub owner: String,
    pub public_key_pem: String,
}

/// Actor document as served under `/api/v1/activitypub/...`.
///
/// The same shape describes remote persons and the local instance actor
/// (type `Application`); only persons pass [`ForgePerson::from_json`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgePerson {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub preferred_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKeyInfo>,
}

impl ForgePerson {
    pub fn from_json(body: &[u8]) -> Result<Self, NotValid> {
        let person: Self = serde_json::from_slice(body)
            .map_err(|e| NotValid::new(Self::TYPE_NAME, vec![e.to_string()]))?;
        is_valid(&person)?;
        Ok(person)
    }
}

impl Validate for ForgePerson {
    const TYPE_NAME: &'static str = "ForgePerson";

    fn validate(&self) -> Vec<String> {
        let mut result = validate_not_empty(&self.kind, "Type");
        result.extend(validate_one_of(&self.kind, &["Person"]));
        result.extend(validate_not_empty(&self.preferred_username, "PreferredUsername"));
        result
    }
}
