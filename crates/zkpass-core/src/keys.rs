//! # Key References
//!
//! A DVR names two verifying keys: the one the proving engine must use for
//! the user data signature and the one for the DVR signature. Either key
//! may be carried inline or referenced through a JWKS endpoint.
//!
//! ## Wire Form
//!
//! `KeyReference` serializes externally tagged, one key per object:
//!
//! ```json
//! {"PublicKey": {"x": "...", "y": "..."}}
//! {"KeysetEndpoint": {"jku": "https://...", "kid": "..."}}
//! ```
//!
//! An object with both tags, or with neither, does not deserialize.
//!
//! ## PublicKey Encoding
//!
//! `x` and `y` are not EC coordinates. They are the first 64 characters and
//! the remainder of the base64 body of a PEM `PUBLIC KEY` (SPKI) document,
//! which is the encoding the proving service publishes. [`PublicKey::to_pem`]
//! and [`PublicKey::from_pem`] convert between the two.

use serde::{Deserialize, Serialize};

use crate::error::ZkPassError;

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";
const PEM_LINE_WIDTH: usize = 64;

/// An inline public key in the two-part PEM body encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    /// First PEM body line.
    pub x: String,
    /// Remainder of the PEM body.
    pub y: String,
}

impl PublicKey {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Render as a PEM `PUBLIC KEY` document.
    pub fn to_pem(&self) -> String {
        format!("{PEM_HEADER}\n{}\n{}\n{PEM_FOOTER}", self.x, self.y)
    }

    /// Parse a PEM `PUBLIC KEY` document.
    ///
    /// Body line breaks are ignored; the joined body is split after the
    /// first 64 characters. A `PRIVATE KEY` document is rejected with
    /// `KeyFormat` so a signing key is never published by mistake.
    pub fn from_pem(pem: &str) -> Result<Self, ZkPassError> {
        let trimmed = pem.trim();
        if trimmed.contains("PRIVATE KEY") {
            return Err(ZkPassError::KeyFormat(
                "expected a public key, found a private key PEM".into(),
            ));
        }
        let body = trimmed
            .strip_prefix(PEM_HEADER)
            .and_then(|rest| rest.strip_suffix(PEM_FOOTER))
            .ok_or_else(|| ZkPassError::KeyFormat("missing PUBLIC KEY PEM armor".into()))?;
        let joined: String = body.split_whitespace().collect();
        if joined.len() <= PEM_LINE_WIDTH {
            return Err(ZkPassError::KeyFormat(format!(
                "PEM body too short ({} chars)",
                joined.len()
            )));
        }
        let (x, y) = joined.split_at(PEM_LINE_WIDTH);
        let key = Self::new(x, y);
        key.validate()?;
        Ok(key)
    }

    /// Check that both halves are non-empty base64 text.
    pub fn validate(&self) -> Result<(), ZkPassError> {
        for (name, part) in [("x", &self.x), ("y", &self.y)] {
            if part.is_empty() {
                return Err(ZkPassError::KeyFormat(format!("public key {name} is empty")));
            }
            if !part.chars().all(is_base64_char) {
                return Err(ZkPassError::KeyFormat(format!(
                    "public key {name} is not base64 text"
                )));
            }
        }
        Ok(())
    }

    /// Coordinate-for-coordinate comparison. A key whose body is split at a
    /// different point is a different key.
    pub fn same_key(&self, other: &PublicKey) -> bool {
        self.x == other.x && self.y == other.y
    }
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// A reference to a key published in a JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeysetEndpoint {
    /// URL of the JWKS document.
    pub jku: String,
    /// Key id within the document.
    pub kid: String,
}

impl KeysetEndpoint {
    pub fn new(jku: impl Into<String>, kid: impl Into<String>) -> Self {
        Self {
            jku: jku.into(),
            kid: kid.into(),
        }
    }
}

/// One of two ways to name a verifying key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyReference {
    /// The key is carried inline.
    #[serde(rename = "PublicKey")]
    InlinePublicKey(PublicKey),
    /// The key must be fetched from a JWKS endpoint.
    KeysetEndpoint(KeysetEndpoint),
}

impl KeyReference {
    /// Structural check, run when a DVR is parsed.
    ///
    /// Inline keys must have well-formed halves; keyset references must name
    /// both an endpoint and a key id.
    pub fn validate(&self) -> Result<(), ZkPassError> {
        match self {
            Self::InlinePublicKey(key) => key
                .validate()
                .map_err(|e| ZkPassError::MalformedDvr(e.to_string())),
            Self::KeysetEndpoint(ep) => {
                if ep.jku.trim().is_empty() {
                    return Err(ZkPassError::MalformedDvr("keyset endpoint jku is empty".into()));
                }
                if ep.kid.trim().is_empty() {
                    return Err(ZkPassError::MalformedDvr("keyset endpoint kid is empty".into()));
                }
                Ok(())
            }
        }
    }
}

impl From<PublicKey> for KeyReference {
    fn from(key: PublicKey) -> Self {
        Self::InlinePublicKey(key)
    }
}

impl From<KeysetEndpoint> for KeyReference {
    fn from(ep: KeysetEndpoint) -> Self {
        Self::KeysetEndpoint(ep)
    }
}
