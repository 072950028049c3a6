//! NodeInfo discovery documents
//!
//! A remote forge is identified by two documents: the well-known index at
//! `/.well-known/nodeinfo`, whose first link points at the NodeInfo document,
//! and the NodeInfo document itself, of which only `software.name` is used.

use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

use super::actor::{KNOWN_SOURCE_SOFTWARE, SourceSoftware};
use crate::validation::{NotValid, Validate, is_valid, validate_not_empty, validate_one_of};

/// Link entry of the well-known index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoLink {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

/// `/.well-known/nodeinfo` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoIndex {
    #[serde(default)]
    pub links: Vec<NodeInfoLink>,
}

/// Location of a remote NodeInfo document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfoWellKnown {
    pub href: String,
}

impl NodeInfoWellKnown {
    /// Decode the index and keep the first link.
    pub fn from_json(body: &[u8]) -> Result<Self, NotValid> {
        let index: NodeInfoIndex = serde_json::from_slice(body)
            .map_err(|e| NotValid::new(Self::TYPE_NAME, vec![e.to_string()]))?;

        let well_known = Self {
            href: index
                .links
                .into_iter()
                .next()
                .map(|link| link.href)
                .unwrap_or_default(),
        };
        is_valid(&well_known)?;
        Ok(well_known)
    }
}

impl Validate for NodeInfoWellKnown {
    const TYPE_NAME: &'static str = "NodeInfoWellKnown";

    fn validate(&self) -> Vec<String> {
        let mut result = validate_not_empty(&self.href, "Href");
        if !result.is_empty() {
            return result;
        }

        let (host, scheme, has_query) = match Url::parse(&self.href) {
            Ok(url) => (
                url.host_str().unwrap_or_default().to_string(),
                url.scheme().to_string(),
                url.query().is_some(),
            ),
            Err(ParseError::RelativeUrlWithoutBase) => {
                (String::new(), String::new(), self.href.contains('?'))
            }
            Err(e) => {
                result.push(format!("Href is not a valid url: {e}"));
                return result;
            }
        };

        if host.is_empty() {
            result.push("Href has to be absolute".to_string());
        }
        result.extend(validate_one_of(&scheme, &["http", "https"]));
        if has_query {
            result.push("Href may not contain query".to_string());
        }

        result
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SoftwareDocument {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NodeInfoDocument {
    #[serde(default)]
    software: SoftwareDocument,
}

/// Remote software metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub software_name: String,
}

impl NodeInfo {
    pub fn new(software: SourceSoftware) -> Self {
        Self {
            software_name: software.to_string(),
        }
    }

    pub fn from_json(body: &[u8]) -> Result<Self, NotValid> {
        let document: NodeInfoDocument = serde_json::from_slice(body)
            .map_err(|e| NotValid::new(Self::TYPE_NAME, vec![e.to_string()]))?;

        let node_info = Self {
            software_name: document.software.name,
        };
        is_valid(&node_info)?;
        Ok(node_info)
    }

    /// Typed software name, `None` while the record is invalid.
    pub fn source(&self) -> Option<SourceSoftware> {
        self.software_name.parse().ok()
    }
}

impl Validate for NodeInfo {
    const TYPE_NAME: &'static str = "NodeInfo";

    fn validate(&self) -> Vec<String> {
        let result = validate_not_empty(&self.software_name, "SoftwareName");
        if !result.is_empty() {
            return result;
        }
        validate_one_of(&self.software_name, &KNOWN_SOURCE_SOFTWARE)
    }
}
