//! # Proof Tokens
//!
//! The proving service answers a DVR with a proof token: an ES256 JWS,
//! signed by the service, whose `data` claim is a [`ZkPassProof`]. Besides
//! the opaque zkVM receipt (`zkproof`) it carries the metadata the Verifier
//! cross-checks before trusting the result: which DVR was answered, its
//! digest, the keys the service actually used, and when the proof was made.
//!
//! [`parse_proof_token`] reads that metadata without checking the service
//! signature. The signature is checked later, by the proving engine's
//! cryptographic verification step, after all metadata gates have passed.

use serde::{Deserialize, Serialize};
use zkpass_core::{DvrDigest, DvrId, PublicKey, ZkPassError};
use zkpass_crypto::decode_jws_unverified;

/// The payload of a proof token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkPassProof {
    /// Opaque zkVM receipt.
    pub zkproof: String,
    pub dvr_title: String,
    pub dvr_id: DvrId,
    /// Digest of the DVR the service evaluated.
    pub dvr_digest: DvrDigest,
    /// Key the service verified the user data signature with.
    pub user_data_verifying_key: PublicKey,
    /// Key the service verified the DVR signature with.
    pub dvr_verifying_key: PublicKey,
    /// Issuance time, Unix epoch seconds.
    pub time_stamp: u64,
}

/// The metadata of a proof, without the receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofMetadata {
    pub dvr_title: String,
    pub dvr_id: DvrId,
    pub dvr_digest: DvrDigest,
    pub user_data_verifying_key: PublicKey,
    pub dvr_verifying_key: PublicKey,
    /// Issuance time, Unix epoch seconds.
    pub issued_at: u64,
}

impl ZkPassProof {
    pub fn metadata(&self) -> ProofMetadata {
        ProofMetadata {
            dvr_title: self.dvr_title.clone(),
            dvr_id: self.dvr_id.clone(),
            dvr_digest: self.dvr_digest.clone(),
            user_data_verifying_key: self.user_data_verifying_key.clone(),
            dvr_verifying_key: self.dvr_verifying_key.clone(),
            issued_at: self.time_stamp,
        }
    }

    /// Parse the `data` claim of a proof token.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ZkPassError> {
        serde_json::from_value(value)
            .map_err(|e| ZkPassError::InvalidProof(format!("proof payload: {e}")))
    }
}

/// Decode a proof token and extract its payload, without signature checks.
///
/// # Errors
///
/// `InvalidProof` if the token is not a compact JWS, has no `data` claim,
/// or the claim is not a well-formed proof.
pub fn parse_proof_token(token: &str) -> Result<ZkPassProof, ZkPassError> {
    let decoded =
        decode_jws_unverified(token).map_err(|e| ZkPassError::InvalidProof(e.to_string()))?;
    let data = decoded
        .data()
        .cloned()
        .ok_or_else(|| ZkPassError::InvalidProof("proof token has no data claim".into()))?;
    ZkPassProof::from_value(data)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use zkpass_crypto::{generate_key_pair, sign_data_to_jws_token, PrivateKeyPem};

    pub(crate) fn sample_proof() -> ZkPassProof {
        ZkPassProof {
            zkproof: "receipt".into(),
            dvr_title: "Age Check".into(),
            dvr_id: DvrId::from("dvr-1"),
            dvr_digest: DvrDigest::from_hex("ab".repeat(32)),
            user_data_verifying_key: PublicKey::new("UUUU", "DDDD"),
            dvr_verifying_key: PublicKey::new("VVVV", "KKKK"),
            time_stamp: 1_700_000_000,
        }
    }

    fn signer() -> PrivateKeyPem {
        generate_key_pair().unwrap().0
    }

    #[test]
    fn parses_signed_proof_token() {
        let proof = sample_proof();
        let token =
            sign_data_to_jws_token(&signer(), serde_json::to_value(&proof).unwrap(), None).unwrap();
        let parsed = parse_proof_token(&token).unwrap();
        assert_eq!(parsed, proof);
        assert_eq!(parsed.metadata().issued_at, 1_700_000_000);
    }

    #[test]
    fn missing_field_is_invalid_proof() {
        let mut v = serde_json::to_value(sample_proof()).unwrap();
        v.as_object_mut().unwrap().remove("dvr_digest");
        let token = sign_data_to_jws_token(&signer(), v, None).unwrap();
        match parse_proof_token(&token) {
            Err(ZkPassError::InvalidProof(msg)) => assert!(msg.contains("dvr_digest")),
            other => panic!("expected InvalidProof, got {other:?}"),
        }
    }

    #[test]
    fn non_jws_is_invalid_proof() {
        assert!(matches!(
            parse_proof_token("not-a-token"),
            Err(ZkPassError::InvalidProof(_))
        ));
    }

    #[test]
    fn token_without_data_claim_is_invalid_proof() {
        // {"alg":"ES256"} . {"sub":"x"} . sig
        let token = "eyJhbGciOiJFUzI1NiJ9.eyJzdWIiOiJ4In0.c2ln";
        assert!(matches!(
            parse_proof_token(token),
            Err(ZkPassError::InvalidProof(_))
        ));
    }

    #[test]
    fn negative_time_stamp_is_invalid_proof() {
        let mut v = serde_json::to_value(sample_proof()).unwrap();
        v["time_stamp"] = json!(-5);
        assert!(matches!(
            ZkPassProof::from_value(v),
            Err(ZkPassError::InvalidProof(_))
        ));
    }
}
