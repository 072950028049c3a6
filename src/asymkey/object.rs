//! Signed git objects
//!
//! Splits raw commit and tag objects into the signed payload and the
//! signature block.

const SIGNATURE_HEADERS: [&str; 2] = ["gpgsig ", "gpgsig-sha256 "];
const ARMOR_STARTS: [&str; 2] = [
    "-----BEGIN PGP SIGNATURE-----",
    "-----BEGIN SSH SIGNATURE-----",
];

/// Signature block and the exact bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSignature {
    pub payload: String,
    pub signature: String,
}

/// The parts of a commit or tag that signature verification needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitObject {
    /// Committer (commits) or tagger (tags) email
    pub committer_email: Option<String>,
    pub signature: Option<ObjectSignature>,
}

fn email_of(identity_line: &str) -> Option<String> {
    let start = identity_line.find('<')?;
    let end = identity_line[start..].find('>')? + start;
    Some(identity_line[start + 1..end].to_string())
}

impl GitObject {
    /// Parse a raw commit object (`git cat-file commit`).
    ///
    /// The payload is the commit without its `gpgsig`/`gpgsig-sha256`
    /// header and continuation lines.
    pub fn from_commit(raw: &str) -> Self {
        let mut payload = String::with_capacity(raw.len());
        let mut signature = String::new();
        let mut committer_email = None;
        let mut in_headers = true;
        let mut in_signature = false;

        for line in raw.split_inclusive('\n') {
            if !in_headers {
                payload.push_str(line);
                continue;
            }

            if in_signature {
                if let Some(continuation) = line.strip_prefix(' ') {
                    signature.push_str(continuation);
                    continue;
                }
                in_signature = false;
            }

            if line == "\n" {
                in_headers = false;
            } else if let Some(first) = SIGNATURE_HEADERS
                .iter()
                .find_map(|header| line.strip_prefix(header))
            {
                in_signature = true;
                signature.push_str(first);
                continue;
            } else if let Some(identity) = line.strip_prefix("committer ") {
                committer_email = email_of(identity);
            }
            payload.push_str(line);
        }

        Self {
            committer_email,
            signature: (!signature.is_empty()).then_some(ObjectSignature {
                payload,
                signature,
            }),
        }
    }

    /// Parse a raw annotated tag object (`git cat-file tag`).
    ///
    /// The signature is the trailing armor block; everything before it is
    /// the payload.
    pub fn from_tag(raw: &str) -> Self {
        let committer_email = raw
            .lines()
            .take_while(|line| !line.is_empty())
            .find_map(|line| line.strip_prefix("tagger "))
            .and_then(email_of);

        let armor_start = ARMOR_STARTS
            .iter()
            .filter_map(|armor| {
                if raw.starts_with(armor) {
                    Some(0)
                } else {
                    raw.rfind(&format!("\n{armor}")).map(|idx| idx + 1)
                }
            })
            .max();

        let signature = armor_start.map(|start| ObjectSignature {
            payload: raw[..start].to_string(),
            signature: raw[start..].to_string(),
        });

        Self {
            committer_email,
            signature,
        }
    }
}
