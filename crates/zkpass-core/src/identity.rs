//! # DVR Identifiers
//!
//! `DvrId` is the lookup key a Verifier registers a DVR under and the value a
//! proof token echoes back as `dvr_id`. It is a plain string on the wire;
//! freshly minted ids are UUID v4.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a Data Verification Request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DvrId(String);

impl DvrId {
    /// Mint a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for DvrId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for DvrId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DvrId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for DvrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
