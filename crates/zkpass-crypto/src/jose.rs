//! # JOSE Tokens: ES256 JWS and ECDH-ES JWE
//!
//! Every token in the protocol is a compact JWT whose payload carries the
//! application value under a single `"data"` claim:
//!
//! - DVRs, user data, and proof tokens are JWS signed with ES256.
//! - Holder-to-engine payloads are JWE with `alg = ECDH-ES`,
//!   `enc = A256GCM`, `typ = JWT`.
//!
//! A signed token may carry a `jku`/`kid` header pair pointing at the JWKS
//! document that publishes the signer's verifying key.
//!
//! [`decode_jws_unverified`] reads a JWS without checking the signature. It
//! exists so a proof token's metadata can be inspected and cross-checked
//! before the service key is fetched; nothing it returns may be trusted on
//! its own.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use josekit::jwe::{JweHeader, ECDH_ES};
use josekit::jws::{JwsHeader, ES256};
use josekit::jwt::{self, JwtPayload};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use zkpass_core::{KeysetEndpoint, PublicKey, ZkPassError};

use crate::pem::PrivateKeyPem;

/// Name of the claim that wraps every payload.
pub const DATA_CLAIM: &str = "data";

const TOKEN_TYPE: &str = "JWT";
const CONTENT_ENCRYPTION: &str = "A256GCM";

/// The protected header fields the protocol reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub jku: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

impl TokenHeader {
    /// The `jku`/`kid` hint, if both are present and non-empty.
    pub fn keyset_endpoint(&self) -> Option<KeysetEndpoint> {
        match (self.jku.as_deref(), self.kid.as_deref()) {
            (Some(jku), Some(kid)) if !jku.is_empty() && !kid.is_empty() => {
                Some(KeysetEndpoint::new(jku, kid))
            }
            _ => None,
        }
    }
}

/// A JWS whose signature has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedJws {
    /// The value under the `data` claim.
    pub data: Value,
    pub header: TokenHeader,
}

/// A JWS decoded without signature verification.
#[derive(Debug, Clone)]
pub struct UnverifiedJws {
    pub header: TokenHeader,
    /// The whole claims set, not just `data`.
    pub payload: Value,
}

impl UnverifiedJws {
    /// The value under the `data` claim.
    pub fn data(&self) -> Option<&Value> {
        self.payload.get(DATA_CLAIM)
    }
}

/// A compact token that does not have the JWS shape.
#[derive(Debug, Error)]
#[error("malformed compact token: {0}")]
pub struct MalformedToken(pub String);

fn jose(e: josekit::JoseError) -> ZkPassError {
    ZkPassError::Jose(e.to_string())
}

fn data_payload(data: Value) -> Result<JwtPayload, ZkPassError> {
    let mut payload = JwtPayload::new();
    payload.set_claim(DATA_CLAIM, Some(data)).map_err(jose)?;
    Ok(payload)
}

/// Sign `data` into a compact ES256 JWS.
///
/// When `verifying_key_jwks` is given its `jku` and `kid` go into the
/// protected header.
pub fn sign_data_to_jws_token(
    signing_key: &PrivateKeyPem,
    data: Value,
    verifying_key_jwks: Option<&KeysetEndpoint>,
) -> Result<String, ZkPassError> {
    let mut header = JwsHeader::new();
    header.set_token_type(TOKEN_TYPE);
    if let Some(ep) = verifying_key_jwks {
        header.set_jwk_set_url(ep.jku.as_str());
        header.set_key_id(ep.kid.as_str());
    }

    let payload = data_payload(data)?;
    let signer = ES256
        .signer_from_pem(signing_key.expose())
        .map_err(|e| ZkPassError::KeyFormat(format!("ES256 signing key: {e}")))?;
    jwt::encode_with_signer(&payload, &header, &signer).map_err(jose)
}

/// Verify an ES256 JWS and return its `data` claim and header.
///
/// # Errors
///
/// - `KeyFormat` if `key` is not a usable EC public key.
/// - `Jose` if the signature does not verify or the token is malformed.
/// - `MissingRootDataElement` if the payload has no `data` claim.
pub fn verify_jws_token(key: &PublicKey, jws_token: &str) -> Result<VerifiedJws, ZkPassError> {
    let verifier = ES256
        .verifier_from_pem(key.to_pem())
        .map_err(|e| ZkPassError::KeyFormat(format!("ES256 verifying key: {e}")))?;
    let (payload, _) = jwt::decode_with_verifier(jws_token, &verifier).map_err(jose)?;
    let data = payload
        .claim(DATA_CLAIM)
        .cloned()
        .ok_or(ZkPassError::MissingRootDataElement)?;
    let header = decode_jws_unverified(jws_token)
        .map(|t| t.header)
        .map_err(|e| ZkPassError::Jose(e.to_string()))?;
    Ok(VerifiedJws { data, header })
}

/// Sign a bare claims set into a compact ES256 JWS, without a `data` wrapper.
pub fn sign_jws_claims(
    signing_key: &PrivateKeyPem,
    claims: serde_json::Map<String, Value>,
) -> Result<String, ZkPassError> {
    let payload = JwtPayload::from_map(claims).map_err(jose)?;
    let signer = ES256
        .signer_from_pem(signing_key.expose())
        .map_err(|e| ZkPassError::KeyFormat(format!("ES256 signing key: {e}")))?;
    jwt::encode_with_signer(&payload, &JwsHeader::new(), &signer).map_err(jose)
}

/// Verify an ES256 JWS and return its whole claims set.
///
/// For tokens that do not follow the `data` claim convention, such as the
/// key attestations in the proving service's JWKS.
pub fn verify_jws_claims(key: &PublicKey, jws_token: &str) -> Result<Value, ZkPassError> {
    let verifier = ES256
        .verifier_from_pem(key.to_pem())
        .map_err(|e| ZkPassError::KeyFormat(format!("ES256 verifying key: {e}")))?;
    let (payload, _) = jwt::decode_with_verifier(jws_token, &verifier).map_err(jose)?;
    Ok(Value::Object(payload.claims_set().clone()))
}

/// Encrypt `data` to the holder of `key` as a compact ECDH-ES/A256GCM JWE.
pub fn encrypt_data_to_jwe_token(key: &PublicKey, data: Value) -> Result<String, ZkPassError> {
    let mut header = JweHeader::new();
    header.set_token_type(TOKEN_TYPE);
    header.set_content_encryption(CONTENT_ENCRYPTION);

    let payload = data_payload(data)?;
    let encrypter = ECDH_ES
        .encrypter_from_pem(key.to_pem())
        .map_err(|e| ZkPassError::KeyFormat(format!("ECDH-ES encryption key: {e}")))?;
    jwt::encode_with_encrypter(&payload, &header, &encrypter).map_err(jose)
}

/// Decrypt a compact JWE and return its `data` claim.
pub fn decrypt_jwe_token(key: &PrivateKeyPem, jwe_token: &str) -> Result<Value, ZkPassError> {
    let decrypter = ECDH_ES
        .decrypter_from_pem(key.expose())
        .map_err(|e| ZkPassError::KeyFormat(format!("ECDH-ES decryption key: {e}")))?;
    let (payload, _) = jwt::decode_with_decrypter(jwe_token, &decrypter).map_err(jose)?;
    payload
        .claim(DATA_CLAIM)
        .cloned()
        .ok_or(ZkPassError::MissingRootDataElement)
}

/// Decode a compact JWS without verifying its signature.
pub fn decode_jws_unverified(token: &str) -> Result<UnverifiedJws, MalformedToken> {
    let mut parts = token.trim().split('.');
    let (header, payload) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(_sig), None) => (h, p),
        _ => return Err(MalformedToken("expected three dot-separated segments".into())),
    };
    let header: TokenHeader = serde_json::from_slice(&decode_segment(header, "header")?)
        .map_err(|e| MalformedToken(format!("header is not a JSON object: {e}")))?;
    let payload: Value = serde_json::from_slice(&decode_segment(payload, "payload")?)
        .map_err(|e| MalformedToken(format!("payload is not JSON: {e}")))?;
    if !payload.is_object() {
        return Err(MalformedToken("payload is not a JSON object".into()));
    }
    Ok(UnverifiedJws { header, payload })
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, MalformedToken> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| MalformedToken(format!("{name} is not base64url: {e}")))
}
