//! # Proving Engine Traits
//!
//! [`ProofEngine`] is the Holder's and Verifier's view of the proving
//! service: publish an encryption key, turn encrypted inputs into a proof
//! token, and check a proof token cryptographically. The HTTP client and
//! the in-process mock engine both implement it, so the protocol
//! orchestration is written once against the trait.
//!
//! [`ZkVmBackend`] is one zkVM's receipt verifier. Receipt verification is
//! CPU-bound and synchronous; engines call it after the service signature
//! on the proof token has been checked.
//!
//! Both traits require `Send + Sync` and are object safe.

use async_trait::async_trait;
use serde_json::Value;
use zkpass_core::{PublicKey, QueryEngineVersionInfo, ZkPassError, ZkVm};

use crate::proof::ZkPassProof;

/// The outcome of cryptographic proof verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedProof {
    /// The query result committed to by the receipt.
    pub output: Value,
    /// The signed proof payload.
    pub proof: ZkPassProof,
}

/// A proving service.
#[async_trait]
pub trait ProofEngine: Send + Sync {
    /// Fail fast, without I/O, if proof generation cannot be authorized.
    ///
    /// # Errors
    ///
    /// `MissingApiKey` when the engine requires credentials it lacks.
    fn check_credentials(&self) -> Result<(), ZkPassError> {
        Ok(())
    }

    /// The key Holders encrypt user data and DVR tokens to.
    async fn encryption_public_key(&self) -> Result<PublicKey, ZkPassError>;

    /// Evaluate an encrypted DVR over encrypted user data.
    ///
    /// Both arguments are JWE tokens wrapping a JWS. Returns the proof token.
    ///
    /// # Errors
    ///
    /// `ProofGeneration` for every failure, carrying the upstream status.
    async fn generate_proof(
        &self,
        encrypted_user_data: &str,
        encrypted_dvr: &str,
    ) -> Result<String, ZkPassError>;

    /// Check the service signature and the zkVM receipt of a proof token.
    ///
    /// This is the last verification gate; metadata checks happen before it.
    async fn verify_proof(&self, proof_token: &str) -> Result<VerifiedProof, ZkPassError>;
}

/// Receipt verification for one zkVM.
pub trait ZkVmBackend: Send + Sync {
    fn zkvm(&self) -> ZkVm;

    /// Engine and query method versions a DVR for this backend must carry.
    fn version_info(&self) -> QueryEngineVersionInfo;

    /// Verify a receipt and return the committed query output.
    ///
    /// # Errors
    ///
    /// `InvalidProof` if the receipt does not verify.
    fn verify_zkproof(&self, zkproof: &str) -> Result<Value, ZkPassError>;
}
