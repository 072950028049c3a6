//! ForgeFed activities
//!
//! Inbound payloads are decoded leniently field by field so that a single
//! malformed document reports every problem at once. Only payloads that pass
//! [`validate_like`] become a [`ForgeLike`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{NotValid, Validate, is_valid, validate_not_empty, validate_one_of};

pub const LIKE_TYPE: &str = "Like";

/// Inline object received in place of an IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineObject {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Reference to an actor or object: either a bare IRI or an embedded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IriOrObject {
    Iri(String),
    Object(InlineObject),
}

impl IriOrObject {
    /// The IRI, taken from the object's `id` for inline objects.
    pub fn iri(&self) -> &str {
        match self {
            Self::Iri(iri) => iri,
            Self::Object(object) => &object.id,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(iri) => Some(Self::Iri(iri.clone())),
            Value::Object(_) => serde_json::from_value(value.clone())
                .ok()
                .map(Self::Object),
            _ => None,
        }
    }
}

impl From<&str> for IriOrObject {
    fn from(iri: &str) -> Self {
        Self::Iri(iri.to_string())
    }
}

/// A Like as received from the wire, before validation.
#[derive(Debug, Clone, Default)]
struct UncheckedLike {
    kind: String,
    actor: Option<IriOrObject>,
    object: Option<IriOrObject>,
    start_time: Option<DateTime<Utc>>,
}

impl UncheckedLike {
    /// Decode every field independently. Unparseable JSON leaves all fields
    /// unset, a bad field leaves only that one unset.
    fn from_json(body: &[u8]) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };

        Self {
            kind: map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            actor: map.get("actor").and_then(IriOrObject::from_value),
            object: map.get("object").and_then(IriOrObject::from_value),
            start_time: map
                .get("startTime")
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|time| time.with_timezone(&Utc)),
        }
    }
}

impl Validate for UncheckedLike {
    const TYPE_NAME: &'static str = "ForgeLike";

    fn validate(&self) -> Vec<String> {
        let mut result = Vec::new();
        result.extend(validate_not_empty(&self.kind, "type"));
        result.extend(validate_one_of(&self.kind, &[LIKE_TYPE]));

        match &self.actor {
            None => result.push("Actor should not be nil.".to_string()),
            Some(actor) => result.extend(validate_not_empty(actor.iri(), "actor")),
        }
        match &self.object {
            None => result.push("Object should not be nil.".to_string()),
            Some(object) => result.extend(validate_not_empty(object.iri(), "object")),
        }

        if self.start_time.is_none() {
            result.push("StartTime was invalid.".to_string());
        }

        result
    }
}

/// List every violation of a Like payload.
pub fn validate_like(body: &[u8]) -> Vec<String> {
    UncheckedLike::from_json(body).validate()
}

/// A validated federated star.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgeLike {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "startTime")]
    start_time: DateTime<Utc>,
    actor: IriOrObject,
    object: IriOrObject,
}

impl ForgeLike {
    pub fn new(actor_iri: &str, object_iri: &str, start_time: DateTime<Utc>) -> Result<Self, NotValid> {
        Self::try_from_unchecked(UncheckedLike {
            kind: LIKE_TYPE.to_string(),
            actor: Some(actor_iri.into()),
            object: Some(object_iri.into()),
            start_time: Some(start_time),
        })
    }

    pub fn from_json(body: &[u8]) -> Result<Self, NotValid> {
        Self::try_from_unchecked(UncheckedLike::from_json(body))
    }

    fn try_from_unchecked(unchecked: UncheckedLike) -> Result<Self, NotValid> {
        is_valid(&unchecked)?;
        match unchecked {
            UncheckedLike {
                actor: Some(actor),
                object: Some(object),
                start_time: Some(start_time),
                ..
            } => Ok(Self {
                kind: LIKE_TYPE,
                start_time,
                actor,
                object,
            }),
            _ => Err(NotValid::new(
                UncheckedLike::TYPE_NAME,
                vec!["incomplete activity".to_string()],
            )),
        }
    }

    pub fn actor(&self) -> &IriOrObject {
        &self.actor
    }

    pub fn object(&self) -> &IriOrObject {
        &self.object
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Whether this activity happened after `latest`. `None` means the sender
    /// was never seen before.
    pub fn is_newer(&self, latest: Option<DateTime<Utc>>) -> bool {
        latest.is_none_or(|latest| self.start_time > latest)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 27, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_forge_like() {
        let like = ForgeLike::new(
            "https://repo.prod.meissa.de/api/v1/activitypub/user-id/1",
            "https://codeberg.org/api/v1/activitypub/repository-id/1",
            start(),
        )
        .unwrap();

        assert_eq!(
            like.actor().iri(),
            "https://repo.prod.meissa.de/api/v1/activitypub/user-id/1"
        );
        assert!(!like.actor().is_inline());
    }

    #[test]
    fn test_new_forge_like_rejects_empty_actor() {
        let err = ForgeLike::new("", "https://codeberg.org/x", start()).unwrap_err();
        assert_eq!(err.violations, vec!["actor should not be empty".to_string()]);
    }

    #[test]
    fn test_marshal_field_order() {
        let like = ForgeLike::new(
            "https://repo.prod.meissa.de/api/v1/activitypub/user-id/1",
            "https://codeberg.org/api/v1/activitypub/repository-id/1",
            start(),
        )
        .unwrap();

        let json = String::from_utf8(like.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Like","startTime":"2024-03-27T00:00:00Z","actor":"https://repo.prod.meissa.de/api/v1/activitypub/user-id/1","object":"https://codeberg.org/api/v1/activitypub/repository-id/1"}"#
        );
    }

    #[test]
    fn test_unmarshal_valid() {
        let body = br#"{"type":"Like","startTime":"2024-03-27T00:00:00Z","actor":"https://repo.prod.meissa.de/api/v1/activitypub/user-id/1","object":"https://codeberg.org/api/v1/activitypub/repository-id/1"}"#;
        let like = ForgeLike::from_json(body).unwrap();
        assert_eq!(like.start_time(), start());
    }

    #[test]
    fn test_rubbish_reports_all_fields() {
        let violations = validate_like(b"{rubbish}");
        assert_eq!(violations.len(), 5);
        assert_eq!(
            violations,
            vec![
                "type should not be empty".to_string(),
                "Value  is not contained in allowed values [Like]".to_string(),
                "Actor should not be nil.".to_string(),
                "Object should not be nil.".to_string(),
                "StartTime was invalid.".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_start_time() {
        let body = br#"{"type":"Like","actor":"https://a.b/api/v1/activitypub/user-id/1","object":"https://c.d/api/v1/activitypub/repository-id/1","startTime":"not a date"}"#;
        assert_eq!(
            validate_like(body),
            vec!["StartTime was invalid.".to_string()]
        );
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let missing = br#"{"actor":"https://a.b/x","object":"https://c.d/y","startTime":"2024-03-27T00:00:00Z"}"#;
        assert_eq!(validate_like(missing)[0], "type should not be empty");

        let wrong = br#"{"type":"bad-type","actor":"https://a.b/x","object":"https://c.d/y","startTime":"2024-03-27T00:00:00Z"}"#;
        assert_eq!(
            validate_like(wrong),
            vec!["Value bad-type is not contained in allowed values [Like]".to_string()]
        );
    }

    #[test]
    fn test_inline_object_is_recorded() {
        let body = br#"{"type":"Like","actor":{"id":"https://a.b/api/v1/activitypub/user-id/1","type":"Person"},"object":"https://c.d/y","startTime":"2024-03-27T00:00:00Z"}"#;
        let like = ForgeLike::from_json(body).unwrap();
        assert!(like.actor().is_inline());
        assert_eq!(like.actor().iri(), "https://a.b/api/v1/activitypub/user-id/1");
    }

    #[test]
    fn test_is_newer() {
        let like = ForgeLike::new("https://a.b/x", "https://c.d/y", start()).unwrap();
        assert!(like.is_newer(None));
        assert!(like.is_newer(Some(start() - chrono::Duration::seconds(1))));
        assert!(!like.is_newer(Some(start())));
        assert!(!like.is_newer(Some(start() + chrono::Duration::hours(1))));
    }
}
