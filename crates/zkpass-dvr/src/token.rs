//! # DVR Tokens
//!
//! A signed DVR travels as a compact ES256 JWS whose `data` claim is the
//! DVR's JSON value. The signer may put a `jku`/`kid` hint in the header
//! naming where its verifying key is published.
//!
//! To verify a DVR token, the key reference is taken from the header hint
//! when present, otherwise from the payload's `dvr_verifying_key`; the
//! reference is resolved, and only then is the signature checked.

use tracing::debug;
use zkpass_core::{KeyReference, KeysetEndpoint, PublicKey, ZkPassError};
use zkpass_crypto::{
    decode_jws_unverified, sign_data_to_jws_token, verify_jws_token, KeyResolver, PrivateKeyPem,
    TokenHeader,
};

use crate::request::DataVerificationRequest;

impl DataVerificationRequest {
    /// Sign this DVR into a compact JWS.
    ///
    /// # Errors
    ///
    /// `KeyFormat` if the key is not an ES256 signing key.
    pub fn sign_to_jws_token(
        &self,
        signing_key: &PrivateKeyPem,
        verifying_key_jwks: Option<&KeysetEndpoint>,
    ) -> Result<String, ZkPassError> {
        let token = sign_data_to_jws_token(signing_key, self.to_value()?, verifying_key_jwks)?;
        debug!(dvr_id = %self.dvr_id, keyset_hint = verifying_key_jwks.is_some(), "signed DVR");
        Ok(token)
    }

    /// Verify a DVR token against a known key and parse its payload.
    pub fn from_jws_token(token: &str, verifying_key: &PublicKey) -> Result<Self, ZkPassError> {
        let verified = verify_jws_token(verifying_key, token)?;
        Self::from_value(verified.data)
    }

    /// Verify a DVR token, resolving the verifying key from the token itself.
    ///
    /// Returns the DVR and the key that verified it.
    pub async fn from_jws_token_resolved(
        token: &str,
        resolver: &dyn KeyResolver,
    ) -> Result<(Self, PublicKey), ZkPassError> {
        let key_ref = dvr_key_reference_from_token(token)?;
        let key = resolver.resolve(&key_ref).await?;
        let dvr = Self::from_jws_token(token, &key)?;
        Ok((dvr, key))
    }
}

/// Parse a DVR token without verifying its signature.
pub fn decode_dvr_token_unverified(
    token: &str,
) -> Result<(DataVerificationRequest, TokenHeader), ZkPassError> {
    let decoded = decode_jws_unverified(token).map_err(|e| ZkPassError::MalformedDvr(e.to_string()))?;
    let data = decoded
        .data()
        .cloned()
        .ok_or(ZkPassError::MissingRootDataElement)?;
    let dvr = DataVerificationRequest::from_value(data)?;
    Ok((dvr, decoded.header))
}

/// The reference to the key that should verify a DVR token.
///
/// The header's `jku`/`kid` hint takes precedence over the payload's
/// `dvr_verifying_key`.
pub fn dvr_key_reference_from_token(token: &str) -> Result<KeyReference, ZkPassError> {
    let (dvr, header) = decode_dvr_token_unverified(token)?;
    Ok(header
        .keyset_endpoint()
        .map(KeyReference::KeysetEndpoint)
        .unwrap_or(dvr.dvr_verifying_key))
}
