//! Federated actor identities
//!
//! Remote actors are addressed by IRIs such as
//! `https://codeberg.org/api/v1/activitypub/user-id/12345`. Parsing keeps the
//! raw pieces of the input (host case, explicit ports, percent-decoded
//! segments) and requires that re-rendering them yields the input byte for
//! byte. Any component we do not model (query, fragment, userinfo,
//! percent-encoding) therefore fails validation instead of being normalized
//! away.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::validation::{NotValid, Validate, is_valid, validate_not_empty, validate_one_of};

/// Forge software a federated identity originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSoftware {
    Forgejo,
    Gitea,
}

/// Lowercase names of every [`SourceSoftware`].
pub const KNOWN_SOURCE_SOFTWARE: [&str; 2] = ["forgejo", "gitea"];

impl SourceSoftware {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forgejo => "forgejo",
            Self::Gitea => "gitea",
        }
    }
}

impl fmt::Display for SourceSoftware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSoftware {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forgejo" => Ok(Self::Forgejo),
            "gitea" => Ok(Self::Gitea),
            other => Err(format!("unknown source software: {other}")),
        }
    }
}

/// Validated federated actor IRI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorId {
    id: String,
    schema: String,
    host: String,
    port: Option<String>,
    path: String,
    unvalidated_input: String,
}

impl ActorId {
    /// Parse and validate an actor IRI, reporting every violated rule.
    pub fn parse(uri: &str) -> Result<Self, NotValid> {
        let actor = Self::split(uri)?;
        is_valid(&actor)?;
        Ok(actor)
    }

    /// Break `uri` into its pieces without validating them.
    fn split(uri: &str) -> Result<Self, NotValid> {
        let not_absolute = |reason: String| {
            NotValid::new(
                Self::TYPE_NAME,
                vec![format!("{uri:?} is not a valid absolute uri: {reason}")],
            )
        };

        let parsed = Url::parse(uri).map_err(|e| not_absolute(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(not_absolute("uri has no authority".to_string()));
        }

        let (schema, rest) = uri
            .split_once("://")
            .ok_or_else(|| not_absolute("missing '://'".to_string()))?;

        let authority_end = rest
            .find(|c: char| matches!(c, '/' | '?' | '#'))
            .unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let remainder = &rest[authority_end..];
        let raw_path = &remainder[..remainder
            .find(|c: char| matches!(c, '?' | '#'))
            .unwrap_or(remainder.len())];

        // Userinfo is dropped here; the round-trip check reports it.
        let host_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host_port)| host_port);
        let (host, port) = split_host_port(host_port);

        let mut segments = Vec::new();
        for segment in raw_path.split('/').filter(|s| !s.is_empty()) {
            let decoded = urlencoding::decode(segment)
                .map_err(|e| not_absolute(format!("invalid percent-encoding: {e}")))?;
            segments.push(decoded.into_owned());
        }
        let id = segments.pop().unwrap_or_default();

        Ok(Self {
            id,
            schema: schema.to_string(),
            host: host.to_string(),
            port: port.map(str::to_string),
            path: segments.join("/"),
            unvalidated_input: uri.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn authority(&self) -> String {
        match &self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// `{schema}://{host}[:{port}]/{path}/{id}`
    pub fn as_uri(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            self.schema,
            self.authority(),
            self.path,
            self.id
        )
    }

    /// `{schema}://{host}[:{port}]/.well-known/nodeinfo`
    pub fn as_well_known_node_info_uri(&self) -> String {
        format!("{}://{}/.well-known/nodeinfo", self.schema, self.authority())
    }

    /// `@{id}@{host}`, lowercased.
    pub fn as_webfinger(&self) -> String {
        format!(
            "@{}@{}",
            self.id.to_lowercase(),
            self.host.to_lowercase()
        )
    }

    /// Local login name for the remote identity, `{id}-{host}` lowercased.
    pub fn as_login_name(&self) -> String {
        format!("{}{}", self.id.to_lowercase(), self.host_suffix())
    }

    pub fn host_suffix(&self) -> String {
        format!("-{}", self.host.to_lowercase())
    }
}

impl Validate for ActorId {
    const TYPE_NAME: &'static str = "ActorId";

    fn validate(&self) -> Vec<String> {
        let mut result = Vec::new();
        result.extend(validate_not_empty(&self.id, "userId"));
        result.extend(validate_not_empty(&self.schema, "schema"));
        result.extend(validate_not_empty(&self.path, "path"));
        result.extend(validate_not_empty(&self.host, "host"));
        result.extend(validate_not_empty(&self.unvalidated_input, "unvalidatedInput"));

        if !self.schema.is_empty() {
            result.extend(validate_one_of(&self.schema, &["http", "https"]));
        }

        if matches!(
            Host::parse(&self.host),
            Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_))
        ) || self.host.starts_with('[')
        {
            result.push(format!("host may not be an ip literal: {}", self.host));
        }

        let relative = self
            .path
            .split('/')
            .chain(std::iter::once(self.id.as_str()))
            .any(|segment| segment == "." || segment == "..");
        if relative {
            result.push(format!(
                "path may not contain relative segments: {:?}",
                self.path
            ));
        }

        let uri = self.as_uri();
        if uri != self.unvalidated_input {
            result.push(format!(
                "not all input was parsed, \nUnvalidated Input:{:?} \nParsed URI: {:?}",
                self.unvalidated_input, uri
            ));
        }

        result
    }
}

fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        if let Some(end) = host_port.find(']') {
            let (host, tail) = host_port.split_at(end + 1);
            return (host, tail.strip_prefix(':').filter(|p| !p.is_empty()));
        }
        return (host_port, None);
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            (host, Some(port).filter(|p| !p.is_empty()))
        }
        _ => (host_port, None),
    }
}

const PERSON_PATHS: [&str; 2] = ["api/v1/activitypub/user-id", "api/activitypub/user-id"];
const REPOSITORY_PATHS: [&str; 2] = [
    "api/v1/activitypub/repository-id",
    "api/activitypub/repository-id",
];

fn source_violations(source: &str) -> Vec<String> {
    let mut result = validate_not_empty(source, "source");
    result.extend(validate_one_of(source, &KNOWN_SOURCE_SOFTWARE));
    result
}

fn typed_actor(
    type_name: &'static str,
    uri: &str,
    source: &str,
    accepted_paths: &[&str],
    kind: &str,
) -> Result<(ActorId, SourceSoftware), NotValid> {
    let actor = ActorId::split(uri).map_err(|e| NotValid::new(type_name, e.violations))?;

    let mut violations = actor.validate();
    violations.extend(source_violations(source));
    if !accepted_paths.contains(&actor.path.to_lowercase().as_str()) {
        violations.push(format!(
            "path: {:?} has to be a {kind} specific api path",
            actor.path
        ));
    }

    match source.parse::<SourceSoftware>() {
        Ok(software) if violations.is_empty() => Ok((actor, software)),
        _ => Err(NotValid::new(type_name, violations)),
    }
}

/// Federated user identity (`…/api/v1/activitypub/user-id/{id}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonId {
    actor: ActorId,
    source: SourceSoftware,
}

impl PersonId {
    pub fn new(uri: &str, source: &str) -> Result<Self, NotValid> {
        let (actor, source) = typed_actor(Self::TYPE_NAME, uri, source, &PERSON_PATHS, "person")?;
        Ok(Self { actor, source })
    }

    pub fn source(&self) -> SourceSoftware {
        self.source
    }
}

impl Deref for PersonId {
    type Target = ActorId;

    fn deref(&self) -> &ActorId {
        &self.actor
    }
}

impl Validate for PersonId {
    const TYPE_NAME: &'static str = "PersonId";

    fn validate(&self) -> Vec<String> {
        let mut result = self.actor.validate();
        result.extend(source_violations(self.source.as_str()));
        if !PERSON_PATHS.contains(&self.actor.path.to_lowercase().as_str()) {
            result.push(format!(
                "path: {:?} has to be a person specific api path",
                self.actor.path
            ));
        }
        result
    }
}

/// Federated repository identity (`…/api/v1/activitypub/repository-id/{id}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryId {
    actor: ActorId,
    source: SourceSoftware,
}

impl RepositoryId {
    pub fn new(uri: &str, source: &str) -> Result<Self, NotValid> {
        let (actor, source) =
            typed_actor(Self::TYPE_NAME, uri, source, &REPOSITORY_PATHS, "repo")?;
        Ok(Self { actor, source })
    }

    pub fn source(&self) -> SourceSoftware {
        self.source
    }
}

impl Deref for RepositoryId {
    type Target = ActorId;

    fn deref(&self) -> &ActorId {
        &self.actor
    }
}

impl Validate for RepositoryId {
    const TYPE_NAME: &'static str = "RepositoryId";

    fn validate(&self) -> Vec<String> {
        let mut result = self.actor.validate();
        result.extend(source_violations(self.source.as_str()));
        if !REPOSITORY_PATHS.contains(&self.actor.path.to_lowercase().as_str()) {
            result.push(format!(
                "path: {:?} has to be a repo specific api path",
                self.actor.path
            ));
        }
        result
    }
}
