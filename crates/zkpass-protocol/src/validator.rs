//! # Metadata Validator
//!
//! The Verifier's strategy for answering "what did I ask for under this
//! DVR id?". Given the id carried by a proof it returns the DVR the
//! Verifier issued, the key the Verifier signs DVRs with, and the TTL to
//! apply. An unknown or already consumed id is `DvrNotFound`.
//!
//! Implementations must keep get-and-remove semantics: a successful
//! `validate` consumes the id. [`LookupMetadataValidator`] does so through
//! a [`DvrLookup`].

use std::sync::Arc;

use async_trait::async_trait;
use zkpass_core::{DvrId, KeyReference, ZkPassError};
use zkpass_dvr::DataVerificationRequest;

use crate::lookup::DvrLookup;

/// What the Verifier expects a proof for a given DVR id to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedMetadata {
    pub expected_dvr: DataVerificationRequest,
    /// Key the proving engine must have verified the DVR signature with.
    pub expected_verifying_dvr_key: KeyReference,
    /// Maximum proof age in seconds; zero disables the check.
    pub expected_ttl: u64,
}

/// Source of expected metadata for incoming proofs.
#[async_trait]
pub trait MetadataValidator: Send + Sync {
    async fn validate(&self, dvr_id: &DvrId) -> Result<ExpectedMetadata, ZkPassError>;
}

/// Validator backed by a [`DvrLookup`].
///
/// The expected DVR key is the issued DVR's own `dvr_verifying_key` unless
/// one is pinned with [`with_verifying_key`](Self::with_verifying_key).
#[derive(Clone)]
pub struct LookupMetadataValidator {
    lookup: Arc<dyn DvrLookup>,
    ttl_secs: u64,
    verifying_key: Option<KeyReference>,
}

impl LookupMetadataValidator {
    pub fn new(lookup: Arc<dyn DvrLookup>, ttl_secs: u64) -> Self {
        Self {
            lookup,
            ttl_secs,
            verifying_key: None,
        }
    }

    /// Expect every DVR to have been verified with `key`.
    pub fn with_verifying_key(mut self, key: impl Into<KeyReference>) -> Self {
        self.verifying_key = Some(key.into());
        self
    }
}

impl std::fmt::Debug for LookupMetadataValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupMetadataValidator")
            .field("ttl_secs", &self.ttl_secs)
            .field("verifying_key", &self.verifying_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataValidator for LookupMetadataValidator {
    async fn validate(&self, dvr_id: &DvrId) -> Result<ExpectedMetadata, ZkPassError> {
        let dvr = self
            .lookup
            .take_if_present(dvr_id)
            .await?
            .ok_or_else(|| ZkPassError::DvrNotFound {
                dvr_id: dvr_id.to_string(),
            })?;
        let expected_verifying_dvr_key = self
            .verifying_key
            .clone()
            .unwrap_or_else(|| dvr.dvr_verifying_key.clone());
        Ok(ExpectedMetadata {
            expected_dvr: dvr,
            expected_verifying_dvr_key,
            expected_ttl: self.ttl_secs,
        })
    }
}
