//! # Proving Service Client
//!
//! [`ZkPassServiceClient`] implements [`ProofEngine`] over HTTP.
//!
//! ## Service Key Discovery
//!
//! The service publishes `{base}/.well-known/jwks.json` with three entries:
//!
//! | `kid` | Content |
//! |-------|---------|
//! | `VerifyingPubK` | master key, `x`/`y` in the clear |
//! | `ServiceSigningPubK` | `jwt`: ES256 JWT over `{x, y}`, signed by the master key |
//! | `ServiceEncryptionPubK` | `jwt`: same, for the encryption key |
//!
//! The signing and encryption keys are taken from the verified JWT payloads,
//! never from the entries' own `x`/`y`. A master key can be pinned so the
//! keyset is not self-certifying.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/.well-known/jwks.json` | Service keys |
//! | POST   | `/v1/proof` | Generate proof, HTTP Basic auth |

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use zkpass_core::{PublicKey, QueryEngineVersionInfo, ZkPassError};
use zkpass_crypto::{sign_jws_claims, verify_jws_claims, PrivateKeyPem};
use zkpass_zkp::{verify_proof_token, ProofEngine, VerifiedProof, ZkVmRegistry};

use crate::config::ZkPassConfig;
use crate::jwks::{fetch_keyset, find_key, Jwk};

const JWKS_PATH: &str = ".well-known/jwks.json";
const GENERATE_PROOF_PATH: &str = "v1/proof";
const CLIENT_HEADER: &str = "X-zkPass-Client";

pub const KID_VERIFYING_PUB_KEY: &str = "VerifyingPubK";
pub const KID_SERVICE_SIGNING_PUB_KEY: &str = "ServiceSigningPubK";
pub const KID_SERVICE_ENCRYPTION_PUB_KEY: &str = "ServiceEncryptionPubK";

/// Stage reported in `ProofGeneration` errors.
pub const STAGE_REQUESTING_PROOF: &str = "RequestingProof";

/// The proving service's attested keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceKeys {
    /// Verifies proof tokens.
    pub signing: PublicKey,
    /// Holders encrypt inputs to this key.
    pub encryption: PublicKey,
}

/// Build the service keyset a proving service publishes.
///
/// `master` signs attestations over the signing and encryption keys.
pub fn attested_service_keyset(
    master: &PrivateKeyPem,
    master_public: &PublicKey,
    keys: &ServiceKeys,
) -> Result<Vec<Jwk>, ZkPassError> {
    let attest = |kid: &str, key: &PublicKey| -> Result<Jwk, ZkPassError> {
        let mut claims = serde_json::Map::new();
        claims.insert("x".into(), Value::String(key.x.clone()));
        claims.insert("y".into(), Value::String(key.y.clone()));
        Ok(Jwk {
            jwt: Some(sign_jws_claims(master, claims)?),
            ..Jwk::ec(kid, key)
        })
    };
    Ok(vec![
        Jwk::ec(KID_VERIFYING_PUB_KEY, master_public),
        attest(KID_SERVICE_SIGNING_PUB_KEY, &keys.signing)?,
        attest(KID_SERVICE_ENCRYPTION_PUB_KEY, &keys.encryption)?,
    ])
}

#[derive(Serialize)]
struct GenerateProofRequest<'a> {
    user_data_token: &'a str,
    dvr_token: &'a str,
}

#[derive(Deserialize)]
struct GenerateProofResponse {
    proof: String,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    status_text: Option<String>,
}

#[derive(Deserialize)]
struct AttestedKey {
    x: String,
    y: String,
}

/// HTTP client for a zkPass proving service.
pub struct ZkPassServiceClient {
    config: ZkPassConfig,
    http: reqwest::Client,
    registry: ZkVmRegistry,
    pinned_master: Option<PublicKey>,
    keys: Mutex<Option<(ServiceKeys, Instant)>>,
}

impl ZkPassServiceClient {
    /// Create a client; `registry` supplies the receipt verifier for
    /// `config.zkvm`.
    pub fn new(config: ZkPassConfig, registry: ZkVmRegistry) -> Result<Self, ZkPassError> {
        registry.get(config.zkvm)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    CLIENT_HEADER,
                    reqwest::header::HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
                );
                headers
            })
            .build()
            .map_err(|e| ZkPassError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            registry,
            pinned_master: None,
            keys: Mutex::new(None),
        })
    }

    /// Require the keyset's master key to equal `key`.
    pub fn with_pinned_master_key(mut self, key: PublicKey) -> Self {
        self.pinned_master = Some(key);
        self
    }

    pub fn config(&self) -> &ZkPassConfig {
        &self.config
    }

    /// The HTTP client, shared with other collaborators such as the JWKS
    /// resolver.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Versions a DVR for the configured zkVM must carry.
    pub fn version_info(&self) -> Result<QueryEngineVersionInfo, ZkPassError> {
        Ok(self.registry.get(self.config.zkvm)?.version_info())
    }

    /// Fetch and verify the service keys, or return the cached ones.
    pub async fn service_keys(&self) -> Result<ServiceKeys, ZkPassError> {
        let ttl = Duration::from_secs(self.config.jwks_cache_secs);
        let cached = self
            .keys
            .lock()
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < ttl)
            .map(|(keys, _)| keys.clone());
        if let Some(keys) = cached {
            return Ok(keys);
        }

        let jku = self.config.endpoint(JWKS_PATH)?.to_string();
        let entries = fetch_keyset(&self.http, &jku).await?;
        let master = find_key(&jku, &entries, KID_VERIFYING_PUB_KEY)?.public_key();
        if let Some(pinned) = &self.pinned_master {
            if !pinned.same_key(&master) {
                warn!(jku = %jku, "service master key does not match pinned key");
                return Err(ZkPassError::KeysetFetch {
                    jku,
                    reason: "master verifying key does not match the pinned key".into(),
                });
            }
        }
        let keys = ServiceKeys {
            signing: attested_key(&jku, &entries, &master, KID_SERVICE_SIGNING_PUB_KEY)?,
            encryption: attested_key(&jku, &entries, &master, KID_SERVICE_ENCRYPTION_PUB_KEY)?,
        };
        info!(jku = %jku, "service keys verified");
        if !ttl.is_zero() {
            *self.keys.lock() = Some((keys.clone(), Instant::now()));
        }
        Ok(keys)
    }

    /// Forget cached service keys.
    pub fn invalidate_service_keys(&self) {
        *self.keys.lock() = None;
    }

    async fn post_generate_proof(
        &self,
        encrypted_user_data: &str,
        encrypted_dvr: &str,
    ) -> Result<String, ZkPassError> {
        let api_key = self.config.api_key.as_ref().ok_or(ZkPassError::MissingApiKey)?;
        let url = self.config.endpoint(GENERATE_PROOF_PATH)?;
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, api_key.authorization().as_str())
            .json(&GenerateProofRequest {
                user_data_token: encrypted_user_data,
                dvr_token: encrypted_dvr,
            })
            .send()
            .await
            .map_err(|e| generation_error(None, e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| generation_error(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let reported = serde_json::from_str::<ServiceErrorBody>(&body).ok();
            let code = reported
                .as_ref()
                .and_then(|b| b.status)
                .unwrap_or(status.as_u16());
            let text = reported
                .and_then(|b| b.status_text)
                .unwrap_or_else(|| match body.trim() {
                    "" => status.canonical_reason().unwrap_or("").to_string(),
                    text => text.to_string(),
                });
            return Err(generation_error(Some(code), text));
        }

        serde_json::from_str::<GenerateProofResponse>(&body)
            .map(|r| r.proof)
            .map_err(|e| {
                generation_error(
                    Some(status.as_u16()),
                    format!("response carries no proof: {e}"),
                )
            })
    }
}

impl std::fmt::Debug for ZkPassServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZkPassServiceClient")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pinned_master", &self.pinned_master.is_some())
            .finish()
    }
}

fn attested_key(
    jku: &str,
    entries: &[Jwk],
    master: &PublicKey,
    kid: &str,
) -> Result<PublicKey, ZkPassError> {
    let entry = find_key(jku, entries, kid)?;
    let jwt = entry
        .jwt
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ZkPassError::KeysetFetch {
            jku: jku.to_string(),
            reason: format!("{kid} carries no attestation"),
        })?;
    let claims = verify_jws_claims(master, jwt)?;
    let attested: AttestedKey = serde_json::from_value(claims).map_err(|e| {
        ZkPassError::KeyFormat(format!("{kid} attestation payload: {e}"))
    })?;
    let key = PublicKey::new(attested.x, attested.y);
    key.validate()?;
    Ok(key)
}

fn generation_error(status: Option<u16>, status_text: String) -> ZkPassError {
    ZkPassError::ProofGeneration {
        stage: STAGE_REQUESTING_PROOF.into(),
        status,
        status_text,
    }
}

#[async_trait]
impl ProofEngine for ZkPassServiceClient {
    fn check_credentials(&self) -> Result<(), ZkPassError> {
        self.config
            .api_key
            .as_ref()
            .map(|_| ())
            .ok_or(ZkPassError::MissingApiKey)
    }

    async fn encryption_public_key(&self) -> Result<PublicKey, ZkPassError> {
        Ok(self.service_keys().await?.encryption)
    }

    #[tracing::instrument(skip_all, fields(zkvm = %self.config.zkvm))]
    async fn generate_proof(
        &self,
        encrypted_user_data: &str,
        encrypted_dvr: &str,
    ) -> Result<String, ZkPassError> {
        let proof = self
            .post_generate_proof(encrypted_user_data, encrypted_dvr)
            .await;
        match &proof {
            Ok(_) => info!("proof generated"),
            Err(e) => warn!(code = e.code(), "proof generation failed: {e}"),
        }
        proof
    }

    #[tracing::instrument(skip_all, fields(zkvm = %self.config.zkvm))]
    async fn verify_proof(&self, proof_token: &str) -> Result<VerifiedProof, ZkPassError> {
        let keys = self.service_keys().await?;
        let backend = self.registry.get(self.config.zkvm)?;
        verify_proof_token(proof_token, &keys.signing, backend.as_ref())
    }
}
