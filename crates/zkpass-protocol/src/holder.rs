//! # Holder: Proof Generation
//!
//! The Holder has a DVR token from the Verifier and one or more user data
//! tokens from Issuers. It encrypts both for the proving engine and asks
//! for a proof:
//!
//! ```text
//! Idle ──▶ EncryptingInputs ──▶ RequestingProof ──▶ Done
//!               │                     │
//!               └────────┬────────────┘
//!                        ▼
//!                      Failed
//! ```
//!
//! A failed session retains nothing but its state and the phase it failed
//! in. Transport failures surface as a single `ProofGeneration` error
//! naming that phase.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use zkpass_core::ZkPassError;
use zkpass_crypto::{encrypt_data_to_jwe_token, encrypt_jws_token};
use zkpass_dvr::UserDataTokens;
use zkpass_zkp::ProofEngine;

/// Phase of a proof generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HolderState {
    Idle,
    EncryptingInputs,
    RequestingProof,
    Done,
    Failed,
}

impl HolderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::EncryptingInputs => "EncryptingInputs",
            Self::RequestingProof => "RequestingProof",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for HolderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single proof generation run against one engine.
pub struct HolderSession {
    engine: Arc<dyn ProofEngine>,
    state: HolderState,
    failed_in: Option<HolderState>,
}

impl HolderSession {
    pub fn new(engine: Arc<dyn ProofEngine>) -> Self {
        Self {
            engine,
            state: HolderState::Idle,
            failed_in: None,
        }
    }

    pub fn state(&self) -> HolderState {
        self.state
    }

    /// The phase a failed session was in when it failed.
    pub fn failed_in(&self) -> Option<HolderState> {
        self.failed_in
    }

    /// Encrypt the inputs and request a proof token.
    ///
    /// # Errors
    ///
    /// - `MissingApiKey` before any I/O if the engine lacks credentials.
    /// - `ProofGeneration` for transport or service failures.
    /// - JOSE or key errors if the engine's encryption key is unusable.
    #[tracing::instrument(skip_all, fields(user_data_tokens = user_data.len()))]
    pub async fn generate_proof(
        &mut self,
        user_data: &UserDataTokens,
        dvr_token: &str,
    ) -> Result<String, ZkPassError> {
        self.state = HolderState::Idle;
        self.failed_in = None;
        match self.run(user_data, dvr_token).await {
            Ok(proof) => {
                self.state = HolderState::Done;
                info!("proof received");
                Ok(proof)
            }
            Err(e) => {
                self.failed_in = Some(self.state);
                warn!(phase = %self.state, code = e.code(), "proof generation failed: {e}");
                self.state = HolderState::Failed;
                Err(e)
            }
        }
    }

    async fn run(&mut self, user_data: &UserDataTokens, dvr_token: &str) -> Result<String, ZkPassError> {
        self.engine.check_credentials()?;
        if user_data.is_empty() {
            return Err(ZkPassError::MissingRootDataElement);
        }

        self.state = HolderState::EncryptingInputs;
        let key = self
            .engine
            .encryption_public_key()
            .await
            .map_err(|e| transport_failure(HolderState::EncryptingInputs, e))?;
        let encrypted_user_data = encrypt_data_to_jwe_token(&key, Value::String(user_data.encode()?))?;
        let encrypted_dvr = encrypt_jws_token(&key, dvr_token)?;

        self.state = HolderState::RequestingProof;
        self.engine
            .generate_proof(&encrypted_user_data, &encrypted_dvr)
            .await
    }
}

impl std::fmt::Debug for HolderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderSession")
            .field("state", &self.state)
            .field("failed_in", &self.failed_in)
            .finish_non_exhaustive()
    }
}

/// Fetch failures become a `ProofGeneration` error for `phase`; key format
/// and attestation errors pass through.
fn transport_failure(phase: HolderState, e: ZkPassError) -> ZkPassError {
    match e {
        ZkPassError::KeysetFetch { reason, .. } => ZkPassError::ProofGeneration {
            stage: phase.as_str().into(),
            status: None,
            status_text: reason,
        },
        other => other,
    }
}
