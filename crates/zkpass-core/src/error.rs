//! # Error Types: The DVR Protocol Error Taxonomy
//!
//! Every failure the protocol can raise is a variant of [`ZkPassError`].
//! Variants fall into four classes:
//!
//! - **Structural**: the input could not be parsed into the expected shape
//!   (`MalformedDvr`, `InvalidProof`, `KeyFormat`, `MissingRootDataElement`).
//! - **Trust/binding**: the input parsed, but does not match what the
//!   Verifier expects. These are never retried.
//! - **Key resolution**: a `KeysetEndpoint` reference could not be resolved.
//! - **Engine/transport**: the proving service or its configuration failed.
//!
//! Each variant carries a stable machine code (`code()`) and an error key
//! (`key()`) for callers that localize messages or branch on codes.

use thiserror::Error;

/// Top-level error type for the DVR protocol.
#[derive(Error, Debug)]
pub enum ZkPassError {
    /// A DVR payload is missing a required field, has a wrong field type,
    /// or carries a malformed key reference.
    #[error("malformed DVR: {0}")]
    MalformedDvr(String),

    /// A proof token could not be decoded or its metadata extracted.
    #[error("invalid proof token: {0}")]
    InvalidProof(String),

    /// Key material has the wrong format for the requested operation,
    /// e.g. a public key supplied where a private signing key is required.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    /// A JOSE token decoded, but carries no `data` claim.
    #[error("token payload has no \"data\" claim")]
    MissingRootDataElement,

    /// No DVR is registered under this id, or it was already consumed.
    #[error("no DVR registered for id {dvr_id}")]
    DvrNotFound {
        /// The id carried by the proof.
        dvr_id: String,
    },

    #[error("DVR title mismatch: expected {expected:?}, proof carries {actual:?}")]
    MismatchedDvrTitle { expected: String, actual: String },

    #[error("DVR digest mismatch: expected {expected}, proof carries {actual}")]
    MismatchedDvrDigest { expected: String, actual: String },

    /// The key the proving engine used to verify the DVR signature is not
    /// the key the Verifier expects.
    #[error("DVR verifying key mismatch")]
    MismatchedDvrVerifyingKey,

    /// The key the proving engine used to verify the user data signature is
    /// not the key named in the Verifier's DVR.
    #[error("user data verifying key mismatch")]
    MismatchedUserDataVerifyingKey,

    /// The proof is older than the Verifier's TTL window.
    #[error("proof expired: issued at {issued_at}, {elapsed_secs}s elapsed, ttl {ttl_secs}s")]
    ExpiredZkPassProof {
        issued_at: u64,
        elapsed_secs: u64,
        ttl_secs: u64,
    },

    /// The keyset at `jku` holds no key with this `kid`.
    #[error("key {kid:?} not found in keyset {jku}")]
    KeyNotFound { jku: String, kid: String },

    /// The keyset at `jku` could not be fetched or parsed.
    #[error("failed to fetch keyset {jku}: {reason}")]
    KeysetFetch { jku: String, reason: String },

    /// The proving service failed to produce a proof.
    ///
    /// `status` is `None` when the request never received an HTTP response.
    #[error("proof generation failed at {stage} (status {status:?}): {status_text}")]
    ProofGeneration {
        stage: String,
        status: Option<u16>,
        status_text: String,
    },

    /// Proof generation was attempted without API credentials.
    #[error("API key and secret are required for proof generation")]
    MissingApiKey,

    /// The zkVM name is not one of the registered backends.
    #[error("unknown zkVM {0:?}; registered backends are \"r0\" and \"sp1\"")]
    InvalidZkVmName(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Error reported by the JOSE library (signature, encryption, key parsing).
    #[error("JOSE error: {0}")]
    Jose(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ZkPassError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MismatchedUserDataVerifyingKey => "E1001-EUserKeyMismatch",
            Self::MissingRootDataElement => "E1002-ERootMissing",
            Self::Jose(_) => "E1004-EJoseError",
            Self::MismatchedDvrVerifyingKey => "E1005-EDvrKeyMismatch",
            Self::MismatchedDvrTitle { .. } => "E1007-EDvrTitleMismatch",
            Self::MismatchedDvrDigest { .. } => "E1008-EDvrDigestMismatch",
            Self::ExpiredZkPassProof { .. } => "E1009-EProofExpired",
            Self::KeyFormat(_) => "E1010-EInvalidKeyFormat",
            Self::KeyNotFound { .. } => "E1011-EKeyNotFound",
            Self::MissingApiKey => "E1012-EMissingApiKey",
            Self::KeysetFetch { .. } => "E1013-EKeysetFetch",
            Self::ProofGeneration { .. } => "E1015-EProofGeneration",
            Self::InvalidProof(_) => "E1016-EInvalidProof",
            Self::MalformedDvr(_) => "E1019-EMalformedDvr",
            Self::DvrNotFound { .. } => "E1020-EDvrNotFound",
            Self::InvalidZkVmName(_) => "E1021-EInvalidZkVm",
            Self::Canonicalization(_) => "E1022-ECanonicalization",
            Self::Config(_) => "E1023-EConfig",
        }
    }

    /// Error key, suitable as a lookup key for localized messages.
    pub fn key(&self) -> &'static str {
        match self {
            Self::MalformedDvr(_) => "MalformedDvr",
            Self::InvalidProof(_) => "InvalidProof",
            Self::KeyFormat(_) => "KeyFormat",
            Self::MissingRootDataElement => "MissingRootDataElement",
            Self::DvrNotFound { .. } => "DvrNotFound",
            Self::MismatchedDvrTitle { .. } => "MismatchedDvrTitle",
            Self::MismatchedDvrDigest { .. } => "MismatchedDvrDigest",
            Self::MismatchedDvrVerifyingKey => "MismatchedDvrVerifyingKey",
            Self::MismatchedUserDataVerifyingKey => "MismatchedUserDataVerifyingKey",
            Self::ExpiredZkPassProof { .. } => "ExpiredZkPassProof",
            Self::KeyNotFound { .. } => "KeyNotFound",
            Self::KeysetFetch { .. } => "KeysetFetch",
            Self::ProofGeneration { .. } => "ProofGeneration",
            Self::MissingApiKey => "MissingApiKey",
            Self::InvalidZkVmName(_) => "InvalidZkVmName",
            Self::Canonicalization(_) => "Canonicalization",
            Self::Jose(_) => "Jose",
            Self::Config(_) => "Config",
        }
    }

    /// True for failures of a trust/binding check.
    ///
    /// A proof that failed one of these checks must not be resubmitted with
    /// the same DVR; the DVR has already been consumed from the lookup.
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Self::DvrNotFound { .. }
                | Self::MismatchedDvrTitle { .. }
                | Self::MismatchedDvrDigest { .. }
                | Self::MismatchedDvrVerifyingKey
                | Self::MismatchedUserDataVerifyingKey
                | Self::ExpiredZkPassProof { .. }
        )
    }

    /// True for network-level failures a caller may retry.
    ///
    /// Only proof generation without an HTTP response, or with a 5xx/429
    /// response, qualifies.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProofGeneration { status: None, .. } => true,
            Self::ProofGeneration {
                status: Some(code), ..
            } => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use a string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
