//! # Verifier: Proof Verification
//!
//! A proof is accepted only after every gate below passes, in this order.
//! The first failing gate decides the error; later gates do not run.
//!
//! | # | Phase | Gate | Error |
//! |---|-------|------|-------|
//! | 1 | `ParsingProof` | token decodes, metadata extracts | `InvalidProof` |
//! | 2 | `ValidatingMetadata` | validator knows the DVR id | `DvrNotFound` |
//! | 3 | `ValidatingMetadata` | title matches exactly | `MismatchedDvrTitle` |
//! | 4 | `ValidatingDigestAndKeys` | DVR verifying key matches | `MismatchedDvrVerifyingKey` |
//! | 5 | `ValidatingDigestAndKeys` | user data verifying key matches | `MismatchedUserDataVerifyingKey` |
//! | 6 | `ValidatingDigestAndKeys` | DVR digest matches | `MismatchedDvrDigest` |
//! | 7 | `CheckingExpiry` | proof is within the TTL | `ExpiredZkPassProof` |
//! | 8 | `DelegatingCryptoCheck` | engine verifies signature and receipt | engine error |
//!
//! The query output is released only from `Accepted`. Gate 2 consumes the
//! DVR id, so a rejected proof cannot be retried against the same DVR.
//!
//! ## Expiry
//!
//! `time_stamp` is the issuance time. With TTL `t > 0` and current time
//! `now`, the proof is expired iff `now > time_stamp` and
//! `now - time_stamp > t`. A time stamp in the future is not expired.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use zkpass_core::{Clock, KeyReference, PublicKey, SystemClock, ZkPassError};
use zkpass_crypto::KeyResolver;
use zkpass_zkp::{parse_proof_token, ProofEngine, VerifiedProof};

use crate::validator::{ExpectedMetadata, MetadataValidator};

/// Phase of a verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VerifierState {
    Idle,
    ParsingProof,
    ValidatingMetadata,
    ValidatingDigestAndKeys,
    CheckingExpiry,
    DelegatingCryptoCheck,
    Accepted,
    Rejected,
}

impl VerifierState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ParsingProof => "ParsingProof",
            Self::ValidatingMetadata => "ValidatingMetadata",
            Self::ValidatingDigestAndKeys => "ValidatingDigestAndKeys",
            Self::CheckingExpiry => "CheckingExpiry",
            Self::DelegatingCryptoCheck => "DelegatingCryptoCheck",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl std::fmt::Display for VerifierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verifies proofs against a proving engine. Shareable across requests.
#[derive(Clone)]
pub struct ProofVerifier {
    engine: Arc<dyn ProofEngine>,
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
}

impl ProofVerifier {
    pub fn new(engine: Arc<dyn ProofEngine>, resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            engine,
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start a verification session.
    pub fn session(&self) -> VerificationSession<'_> {
        VerificationSession {
            verifier: self,
            state: VerifierState::Idle,
            rejected_in: None,
        }
    }

    /// Run all gates on `proof_token`.
    pub async fn verify(
        &self,
        proof_token: &str,
        validator: &dyn MetadataValidator,
    ) -> Result<VerifiedProof, ZkPassError> {
        self.session().run(proof_token, validator).await
    }
}

impl std::fmt::Debug for ProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofVerifier").finish_non_exhaustive()
    }
}

/// One pass through the verification gates.
#[derive(Debug)]
pub struct VerificationSession<'a> {
    verifier: &'a ProofVerifier,
    state: VerifierState,
    rejected_in: Option<VerifierState>,
}

impl VerificationSession<'_> {
    pub fn state(&self) -> VerifierState {
        self.state
    }

    /// The phase a rejected session was in when it was rejected.
    pub fn rejected_in(&self) -> Option<VerifierState> {
        self.rejected_in
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(
        &mut self,
        proof_token: &str,
        validator: &dyn MetadataValidator,
    ) -> Result<VerifiedProof, ZkPassError> {
        self.state = VerifierState::Idle;
        self.rejected_in = None;
        match self.gates(proof_token, validator).await {
            Ok(accepted) => {
                self.state = VerifierState::Accepted;
                info!(dvr_id = %accepted.proof.dvr_id, "proof accepted");
                Ok(accepted)
            }
            Err(e) => {
                self.rejected_in = Some(self.state);
                warn!(phase = %self.state, code = e.code(), "proof rejected: {e}");
                self.state = VerifierState::Rejected;
                Err(e)
            }
        }
    }

    fn enter(&mut self, state: VerifierState) {
        debug!(phase = %state, "verification phase");
        self.state = state;
    }

    async fn gates(
        &mut self,
        proof_token: &str,
        validator: &dyn MetadataValidator,
    ) -> Result<VerifiedProof, ZkPassError> {
        let verifier = self.verifier;

        self.enter(VerifierState::ParsingProof);
        let metadata = parse_proof_token(proof_token)?.metadata();

        self.enter(VerifierState::ValidatingMetadata);
        let ExpectedMetadata {
            expected_dvr,
            expected_verifying_dvr_key,
            expected_ttl,
        } = validator.validate(&metadata.dvr_id).await?;
        if expected_dvr.dvr_title != metadata.dvr_title {
            return Err(ZkPassError::MismatchedDvrTitle {
                expected: expected_dvr.dvr_title,
                actual: metadata.dvr_title,
            });
        }

        self.enter(VerifierState::ValidatingDigestAndKeys);
        let dvr_key = resolve(verifier, &expected_verifying_dvr_key).await?;
        if !dvr_key.same_key(&metadata.dvr_verifying_key) {
            return Err(ZkPassError::MismatchedDvrVerifyingKey);
        }
        let user_key = resolve(verifier, &expected_dvr.user_data_verifying_key).await?;
        if !user_key.same_key(&metadata.user_data_verifying_key) {
            return Err(ZkPassError::MismatchedUserDataVerifyingKey);
        }
        let digest = expected_dvr.digest()?;
        if digest != metadata.dvr_digest {
            return Err(ZkPassError::MismatchedDvrDigest {
                expected: digest.to_string(),
                actual: metadata.dvr_digest.to_string(),
            });
        }

        self.enter(VerifierState::CheckingExpiry);
        check_expiry(metadata.issued_at, verifier.clock.now_epoch_secs(), expected_ttl)?;

        self.enter(VerifierState::DelegatingCryptoCheck);
        verifier.engine.verify_proof(proof_token).await
    }
}

async fn resolve(verifier: &ProofVerifier, key_ref: &KeyReference) -> Result<PublicKey, ZkPassError> {
    verifier.resolver.resolve(key_ref).await
}

/// The TTL gate. `ttl_secs == 0` disables it.
pub fn check_expiry(issued_at: u64, now: u64, ttl_secs: u64) -> Result<(), ZkPassError> {
    if ttl_secs > 0 && now > issued_at && now - issued_at > ttl_secs {
        return Err(ZkPassError::ExpiredZkPassProof {
            issued_at,
            elapsed_secs: now - issued_at,
            ttl_secs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundaries() {
        assert!(check_expiry(1_000, 1_600, 600).is_ok(), "exactly ttl is still valid");
        assert!(check_expiry(1_000, 1_599, 600).is_ok());
        assert!(matches!(
            check_expiry(1_000, 1_601, 600),
            Err(ZkPassError::ExpiredZkPassProof {
                elapsed_secs: 601,
                ..
            })
        ));
    }

    #[test]
    fn zero_ttl_never_expires() {
        assert!(check_expiry(0, u64::MAX, 0).is_ok());
    }

    #[test]
    fn future_time_stamp_is_not_expired() {
        assert!(check_expiry(2_000, 1_000, 600).is_ok());
    }

    #[test]
    fn state_names() {
        assert_eq!(VerifierState::ValidatingDigestAndKeys.to_string(), "ValidatingDigestAndKeys");
        assert!(VerifierState::Rejected.is_terminal());
        assert!(!VerifierState::CheckingExpiry.is_terminal());
    }
}
