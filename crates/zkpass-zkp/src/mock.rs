//! # Mock Proving Engine
//!
//! An in-process stand-in for the proving service, for tests and local
//! development. It performs every protocol step the real service performs
//! around the zkVM: it decrypts the Holder's inputs, verifies the DVR and
//! user data signatures against resolved keys, and issues a signed proof
//! token carrying the DVR digest, the keys it used and the issuance time.
//!
//! The zkVM itself is replaced by [`MockZkVmBackend`], whose receipt is the
//! query output in a SHA-256 committed envelope:
//!
//! ```text
//! base64url(JCS({"method": ..., "output": ..., "zkvm": ...})) "." hex(SHA-256(JCS(...)))
//! ```
//!
//! ## Security Notice
//!
//! The mock receipt provides NO zero-knowledge privacy and no soundness:
//! anyone can mint one. It must never back a production Verifier.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use zkpass_core::{
    sha256_hex, CanonicalBytes, Clock, PublicKey, QueryEngineVersionInfo, SystemClock, ZkPassError,
    ZkVm,
};
use zkpass_crypto::{
    decrypt_jwe_token, decrypt_to_jws_token, generate_key_pair, sign_data_to_jws_token,
    verify_jws_token, KeyResolver, PrivateKeyPem,
};
use zkpass_dvr::{DataVerificationRequest, UserDataTokens};

use crate::proof::ZkPassProof;
use crate::registry::verify_proof_token;
use crate::traits::{ProofEngine, VerifiedProof, ZkVmBackend};

/// Stage reported in `ProofGeneration` errors raised by the mock engine.
const GENERATION_STAGE: &str = "RequestingProof";

#[derive(Debug, Serialize, Deserialize)]
struct ReceiptEnvelope {
    zkvm: ZkVm,
    method: String,
    output: Value,
}

/// A zkVM backend whose receipts are hash commitments to the output.
#[derive(Debug, Clone)]
pub struct MockZkVmBackend {
    zkvm: ZkVm,
    versions: QueryEngineVersionInfo,
}

impl MockZkVmBackend {
    /// A backend for `zkvm` with a method version derived from its name.
    pub fn new(zkvm: ZkVm) -> Self {
        let method = CanonicalBytes::from_value(json!({"mock-guest": zkvm.as_str()}))
            .map(|b| sha256_hex(&b))
            .unwrap_or_default();
        Self {
            zkvm,
            versions: QueryEngineVersionInfo {
                query_engine_ver: env!("CARGO_PKG_VERSION").to_string(),
                query_method_ver: method,
            },
        }
    }

    /// Override the reported query method version.
    pub fn with_method_ver(mut self, method: impl Into<String>) -> Self {
        self.versions.query_method_ver = method.into();
        self
    }

    /// Mint a receipt committing to `output`.
    pub fn prove(&self, output: &Value) -> Result<String, ZkPassError> {
        let envelope = ReceiptEnvelope {
            zkvm: self.zkvm,
            method: self.versions.query_method_ver.clone(),
            output: output.clone(),
        };
        let bytes = CanonicalBytes::new(&envelope)?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(bytes.as_bytes()),
            sha256_hex(&bytes)
        ))
    }
}

impl ZkVmBackend for MockZkVmBackend {
    fn zkvm(&self) -> ZkVm {
        self.zkvm
    }

    fn version_info(&self) -> QueryEngineVersionInfo {
        self.versions.clone()
    }

    fn verify_zkproof(&self, zkproof: &str) -> Result<Value, ZkPassError> {
        let (encoded, commitment) = zkproof
            .split_once('.')
            .ok_or_else(|| invalid("receipt has no commitment"))?;
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| invalid(&format!("receipt encoding: {e}")))?;
        let value: Value =
            serde_json::from_slice(&raw).map_err(|e| invalid(&format!("receipt body: {e}")))?;
        let canonical = CanonicalBytes::from_value(value.clone())?;
        if sha256_hex(&canonical) != commitment.to_ascii_lowercase() {
            return Err(invalid("receipt commitment does not match its body"));
        }
        let envelope: ReceiptEnvelope =
            serde_json::from_value(value).map_err(|e| invalid(&format!("receipt body: {e}")))?;
        if envelope.zkvm != self.zkvm {
            return Err(invalid(&format!(
                "receipt is for zkVM {}, backend is {}",
                envelope.zkvm, self.zkvm
            )));
        }
        if envelope.method != self.versions.query_method_ver {
            return Err(invalid("receipt was produced by a different query method"));
        }
        Ok(envelope.output)
    }
}

fn invalid(msg: &str) -> ZkPassError {
    ZkPassError::InvalidProof(msg.to_string())
}

/// In-process proving engine.
pub struct MockProofEngine {
    encryption_key: PrivateKeyPem,
    encryption_public: PublicKey,
    signing_key: PrivateKeyPem,
    signing_public: PublicKey,
    backend: MockZkVmBackend,
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
    output: Value,
}

impl MockProofEngine {
    /// An engine with fresh encryption and service signing keys, an `r0`
    /// backend, the system clock and a `{"result": true}` query output.
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Result<Self, ZkPassError> {
        let (encryption_key, encryption_public) = generate_key_pair()?;
        let (signing_key, signing_public) = generate_key_pair()?;
        Ok(Self {
            encryption_key,
            encryption_public,
            signing_key,
            signing_public,
            backend: MockZkVmBackend::new(ZkVm::R0),
            resolver,
            clock: Arc::new(SystemClock),
            output: json!({"result": true}),
        })
    }

    pub fn with_backend(mut self, backend: MockZkVmBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Stamp proofs from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The query output every proof commits to.
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = output;
        self
    }

    pub fn backend(&self) -> &MockZkVmBackend {
        &self.backend
    }

    /// The key proof tokens are signed with.
    pub fn service_signing_key(&self) -> &PublicKey {
        &self.signing_public
    }

    /// Sign an arbitrary proof payload with the service key.
    pub fn issue_proof_token(&self, proof: &ZkPassProof) -> Result<String, ZkPassError> {
        let data = serde_json::to_value(proof).map_err(|e| invalid(&e.to_string()))?;
        sign_data_to_jws_token(&self.signing_key, data, None)
    }

    async fn evaluate(
        &self,
        encrypted_user_data: &str,
        encrypted_dvr: &str,
    ) -> Result<ZkPassProof, ZkPassError> {
        let dvr_jws = decrypt_to_jws_token(&self.encryption_key, encrypted_dvr)?;
        let (dvr, dvr_key) =
            DataVerificationRequest::from_jws_token_resolved(&dvr_jws, self.resolver.as_ref())
                .await?;

        if dvr.zkvm != self.backend.zkvm() {
            return Err(ZkPassError::InvalidZkVmName(dvr.zkvm.to_string()));
        }
        let versions = self.backend.version_info();
        if dvr.query_engine_ver != versions.query_engine_ver
            || dvr.query_method_ver != versions.query_method_ver
        {
            return Err(ZkPassError::MalformedDvr(format!(
                "DVR targets engine {}/{}, backend runs {}/{}",
                dvr.query_engine_ver,
                dvr.query_method_ver,
                versions.query_engine_ver,
                versions.query_method_ver
            )));
        }

        let encoded = match decrypt_jwe_token(&self.encryption_key, encrypted_user_data)? {
            Value::String(s) => s,
            _ => return Err(ZkPassError::Jose("user data payload is not a string".into())),
        };
        let tokens = UserDataTokens::decode(&encoded)?;
        if tokens.is_empty() {
            return Err(ZkPassError::MissingRootDataElement);
        }
        let user_key = self.resolver.resolve(&dvr.user_data_verifying_key).await?;
        for (tag, token) in tokens.iter() {
            verify_jws_token(&user_key, token)?;
            debug!(tag, "user data token verified");
        }

        Ok(ZkPassProof {
            zkproof: self.backend.prove(&self.output)?,
            dvr_digest: dvr.digest()?,
            dvr_title: dvr.dvr_title,
            dvr_id: dvr.dvr_id,
            user_data_verifying_key: user_key,
            dvr_verifying_key: dvr_key,
            time_stamp: self.clock.now_epoch_secs(),
        })
    }
}

impl std::fmt::Debug for MockProofEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProofEngine")
            .field("zkvm", &self.backend.zkvm())
            .field("encryption_public", &self.encryption_public)
            .field("signing_public", &self.signing_public)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProofEngine for MockProofEngine {
    async fn encryption_public_key(&self) -> Result<PublicKey, ZkPassError> {
        Ok(self.encryption_public.clone())
    }

    async fn generate_proof(
        &self,
        encrypted_user_data: &str,
        encrypted_dvr: &str,
    ) -> Result<String, ZkPassError> {
        let proof = self
            .evaluate(encrypted_user_data, encrypted_dvr)
            .await
            .map_err(|e| ZkPassError::ProofGeneration {
                stage: GENERATION_STAGE.into(),
                status: Some(400),
                status_text: e.to_string(),
            })?;
        info!(dvr_id = %proof.dvr_id, time_stamp = proof.time_stamp, "mock proof issued");
        self.issue_proof_token(&proof)
    }

    async fn verify_proof(&self, proof_token: &str) -> Result<VerifiedProof, ZkPassError> {
        verify_proof_token(proof_token, &self.signing_public, &self.backend)
    }
}
