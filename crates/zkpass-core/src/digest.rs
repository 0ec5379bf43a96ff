//! # DVR Digest: SHA-256 over Canonical Bytes
//!
//! A proof token carries the digest of the DVR the proving engine actually
//! evaluated. The Verifier recomputes the digest from its own copy and
//! compares the two, which is what ties a proof to "this exact query".
//!
//! ## Security Invariant
//!
//! `DvrDigest` can only be computed from `CanonicalBytes`. This is enforced
//! by the signature of [`sha256_digest()`], so no caller can digest a DVR
//! through plain `serde_json::to_string` and get a field-order dependent
//! value.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A SHA-256 digest of a canonical DVR, rendered as lowercase hex.
///
/// The hex form is what travels on the wire (`dvr_digest` in proof tokens),
/// so the type serializes transparently as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DvrDigest(String);

impl DvrDigest {
    /// Wrap a hex digest received from the wire.
    ///
    /// Input is lowercased so that comparison against a locally computed
    /// digest is case-insensitive.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    /// The digest as lowercase hex.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DvrDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 digest of canonical bytes.
///
/// # Security Invariant
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`.
pub fn sha256_digest(data: &CanonicalBytes) -> DvrDigest {
    let hash = Sha256::digest(data.as_bytes());
    DvrDigest(hash.iter().map(|b| format!("{b:02x}")).collect())
}

/// Convenience wrapper returning the digest as an owned hex string.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).0
}
