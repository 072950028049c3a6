//! Trust classification of verified signatures

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::keys::User;
use super::verification::ObjectVerification;
use crate::error::AppError;

/// Repository policy deciding which signers are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustModel {
    #[default]
    Default,
    Public,
    Collaborator,
    Committer,
    #[serde(rename = "collaboratorcommitter")]
    CollaboratorCommitter,
}

impl TrustModel {
    /// The model `Default` stands for.
    pub fn resolve(self) -> Self {
        match self {
            Self::Default => Self::Collaborator,
            other => other,
        }
    }
}

impl FromStr for TrustModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "public" => Ok(Self::Public),
            "collaborator" => Ok(Self::Collaborator),
            "committer" => Ok(Self::Committer),
            "collaboratorcommitter" => Ok(Self::CollaboratorCommitter),
            other => Err(format!("unknown trust model: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Trusted,
    Untrusted,
    Unmatched,
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trusted => "trusted",
            Self::Untrusted => "untrusted",
            Self::Unmatched => "unmatched",
        })
    }
}

fn same_user(a: Option<&User>, b: Option<&User>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.id == b.id,
        _ => false,
    }
}

/// Set `verification.trust_status` according to `model`.
///
/// `is_owner_member_collaborator` answers whether a signer belongs to the
/// repository; answers are cached in `key_map` by signing key. A failing
/// callback is logged and counts as "not a member"; the error goes no
/// further. Unverified objects get no status.
pub fn calculate_trust_status<F>(
    verification: &mut ObjectVerification,
    model: TrustModel,
    mut is_owner_member_collaborator: F,
    key_map: &mut HashMap<String, bool>,
) where
    F: FnMut(&User) -> Result<bool, AppError>,
{
    if !verification.verified {
        return;
    }

    let signer = verification.signing_user.as_ref();
    let committer = verification.committing_user.as_ref();

    match model.resolve() {
        TrustModel::Committer => {
            let matches = match (signer, committer) {
                (Some(_), _) => same_user(signer, committer),
                (None, None) => {
                    verification.signing_email.is_some()
                        && verification.signing_email == verification.committing_email
                }
                (None, Some(_)) => false,
            };
            verification.trust_status = Some(if matches {
                TrustStatus::Trusted
            } else {
                TrustStatus::Unmatched
            });
            return;
        }
        TrustModel::Public => {
            verification.trust_status = Some(TrustStatus::Trusted);
            return;
        }
        _ => {}
    }

    let collaborator_committer = model.resolve() == TrustModel::CollaboratorCommitter;

    let Some(signing_user) = signer.cloned() else {
        let mismatch =
            committer.is_some() || verification.signing_email != verification.committing_email;
        verification.trust_status = Some(if collaborator_committer && mismatch {
            TrustStatus::Untrusted
        } else {
            TrustStatus::Trusted
        });
        return;
    };

    let Some(signing_key) = verification.signing_key.as_ref() else {
        verification.trust_status = Some(TrustStatus::Untrusted);
        return;
    };
    let cache_id = signing_key.cache_id();

    let is_member = match key_map.get(&cache_id) {
        Some(is_member) => *is_member,
        None => match is_owner_member_collaborator(&signing_user) {
            Ok(is_member) => {
                key_map.insert(cache_id, is_member);
                is_member
            }
            Err(e) => {
                tracing::warn!(
                    signer = %signing_user.name,
                    error = %e,
                    "Membership check failed, treating signer as untrusted"
                );
                false
            }
        },
    };

    let signer_is_committer = same_user(Some(&signing_user), verification.committing_user.as_ref());
    verification.trust_status = Some(if !is_member {
        if signer_is_committer {
            TrustStatus::Untrusted
        } else {
            TrustStatus::Unmatched
        }
    } else if collaborator_committer && !signer_is_committer {
        TrustStatus::Unmatched
    } else {
        TrustStatus::Trusted
    });
}
