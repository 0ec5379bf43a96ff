//! # Data Verification Request
//!
//! A DVR is the Verifier's question about a Holder's data: which zkVM and
//! engine build should run it, the query itself, and which keys the proving
//! engine must use to authenticate the user data and the DVR.
//!
//! ## Security Invariants
//!
//! - [`DataVerificationRequest::digest`] hashes [`CanonicalBytes`] of the
//!   DVR's JSON value. Field order, an explicit `null` for
//!   `user_data_url`, and key order inside a structured query do not affect
//!   the digest.
//! - Parsing validates the key reference shapes. A DVR that parses is one
//!   whose key references can be resolved without guessing.
//!
//! ## Wire Form
//!
//! ```json
//! {
//!   "zkvm": "r0",
//!   "dvr_title": "...", "dvr_id": "...",
//!   "query_engine_ver": "...", "query_method_ver": "...",
//!   "query": "<JSON text>",
//!   "user_data_url": "https://...",
//!   "user_data_verifying_key": {"PublicKey": {"x": "...", "y": "..."}},
//!   "dvr_verifying_key": {"KeysetEndpoint": {"jku": "...", "kid": "..."}}
//! }
//! ```
//!
//! Unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use zkpass_core::canonical::canonical_json_string;
use zkpass_core::{
    sha256_digest, CanonicalBytes, DvrDigest, DvrId, KeyReference, ZkPassError, ZkVm,
};

use crate::builder::DvrBuilder;

/// A Data Verification Request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVerificationRequest {
    /// The zkVM backend the query targets.
    pub zkvm: ZkVm,

    pub dvr_title: String,

    /// Lookup key under which the Verifier registers this DVR.
    pub dvr_id: DvrId,

    /// Engine version reported by the zkVM backend.
    pub query_engine_ver: String,

    /// Guest program version reported by the zkVM backend.
    pub query_method_ver: String,

    /// The query expression as JSON text.
    ///
    /// On input a structured JSON value is also accepted and stored as its
    /// canonical text.
    #[serde(deserialize_with = "deserialize_query")]
    pub query: String,

    /// Where the Holder can fetch the user data. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_url: Option<String>,

    /// The key the proving engine must verify the user data signature with.
    pub user_data_verifying_key: KeyReference,

    /// The key the proving engine must verify this DVR's signature with.
    pub dvr_verifying_key: KeyReference,
}

fn deserialize_query<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        v @ (Value::Object(_) | Value::Array(_)) => {
            canonical_json_string(&v).map_err(serde::de::Error::custom)
        }
        other => Err(serde::de::Error::custom(format!(
            "query must be JSON text or a JSON object/array, got {other}"
        ))),
    }
}

impl DataVerificationRequest {
    /// Start building a DVR.
    pub fn builder(dvr_title: impl Into<String>) -> DvrBuilder {
        DvrBuilder::new(dvr_title)
    }

    /// Parse a DVR from JSON text.
    ///
    /// # Errors
    ///
    /// - `InvalidZkVmName` if `zkvm` names an unregistered backend.
    /// - `MalformedDvr` if the text is not JSON, a required field is missing
    ///   or mistyped, or a key reference is malformed.
    pub fn from_json(raw: &str) -> Result<Self, ZkPassError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ZkPassError::MalformedDvr(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse a DVR from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ZkPassError> {
        if !value.is_object() {
            return Err(ZkPassError::MalformedDvr("DVR must be a JSON object".into()));
        }
        if let Some(Value::String(name)) = value.get("zkvm") {
            name.parse::<ZkVm>()?;
        }
        let dvr: Self =
            serde_json::from_value(value).map_err(|e| ZkPassError::MalformedDvr(e.to_string()))?;
        dvr.validate()?;
        Ok(dvr)
    }

    /// Inverse of [`serialize`](Self::serialize).
    pub fn deserialize(serialized: &str) -> Result<Self, ZkPassError> {
        Self::from_json(serialized)
    }

    /// Serialize to canonical JSON text.
    pub fn serialize(&self) -> Result<String, ZkPassError> {
        Ok(self.canonical_bytes()?.as_str().to_owned())
    }

    /// The DVR as a JSON value.
    pub fn to_value(&self) -> Result<Value, ZkPassError> {
        serde_json::to_value(self)
            .map_err(|e| ZkPassError::MalformedDvr(format!("DVR does not serialize: {e}")))
    }

    /// Canonical bytes of the DVR, the digest input.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, ZkPassError> {
        Ok(CanonicalBytes::from_value(self.to_value()?)?)
    }

    /// SHA-256 over the canonical bytes.
    pub fn digest(&self) -> Result<DvrDigest, ZkPassError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }

    /// Structural checks beyond what the field types enforce.
    pub fn validate(&self) -> Result<(), ZkPassError> {
        if self.dvr_id.as_str().trim().is_empty() {
            return Err(ZkPassError::MalformedDvr("dvr_id is empty".into()));
        }
        if self.query.trim().is_empty() {
            return Err(ZkPassError::MalformedDvr("query is empty".into()));
        }
        self.user_data_verifying_key
            .validate()
            .map_err(|e| prefix_malformed("user_data_verifying_key", e))?;
        self.dvr_verifying_key
            .validate()
            .map_err(|e| prefix_malformed("dvr_verifying_key", e))?;
        Ok(())
    }
}

fn prefix_malformed(field: &str, err: ZkPassError) -> ZkPassError {
    match err {
        ZkPassError::MalformedDvr(msg) => ZkPassError::MalformedDvr(format!("{field}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use zkpass_core::{KeysetEndpoint, PublicKey};

    pub(crate) fn sample_value() -> Value {
        json!({
            "zkvm": "r0",
            "dvr_title": "Blood Test Verification",
            "dvr_id": "0e6a3a68-3b4d-4b57-8a8a-2d2f5f1c2b11",
            "query_engine_ver": "0.3.0",
            "query_method_ver": "8ac1f0",
            "query": r#"[{"assign":{"ok":{"==":[{"dvar":"lab.ID"},"QH801874"]}}},{"output":{"result":{"lvar":"ok"}}}]"#,
            "user_data_url": "https://issuer.example/user-data",
            "user_data_verifying_key": {
                "KeysetEndpoint": {"jku": "https://issuer.example/jwks.json", "kid": "k-1"}
            },
            "dvr_verifying_key": {"PublicKey": {"x": "AAAA", "y": "BBBB"}}
        })
    }

    pub(crate) fn sample() -> DataVerificationRequest {
        DataVerificationRequest::from_value(sample_value()).unwrap()
    }

    #[test]
    fn parses_all_fields() {
        let dvr = sample();
        assert_eq!(dvr.zkvm, ZkVm::R0);
        assert_eq!(dvr.dvr_title, "Blood Test Verification");
        assert_eq!(
            dvr.user_data_verifying_key,
            KeyReference::from(KeysetEndpoint::new("https://issuer.example/jwks.json", "k-1"))
        );
        assert_eq!(
            dvr.dvr_verifying_key,
            KeyReference::from(PublicKey::new("AAAA", "BBBB"))
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut v = sample_value();
        v["user_data_requests"] = json!({"": {"user_data_url": null}});
        v["extra"] = json!(42);
        assert_eq!(DataVerificationRequest::from_value(v).unwrap(), sample());
    }

    #[test]
    fn missing_required_field_is_malformed() {
        for field in [
            "dvr_title",
            "dvr_id",
            "query_engine_ver",
            "query_method_ver",
            "query",
            "user_data_verifying_key",
            "dvr_verifying_key",
            "zkvm",
        ] {
            let mut v = sample_value();
            v.as_object_mut().unwrap().remove(field);
            match DataVerificationRequest::from_value(v) {
                Err(ZkPassError::MalformedDvr(msg)) => {
                    assert!(msg.contains(field), "{field}: {msg}")
                }
                other => panic!("{field}: expected MalformedDvr, got {other:?}"),
            }
        }
    }

    #[test]
    fn user_data_url_is_optional() {
        let mut v = sample_value();
        v.as_object_mut().unwrap().remove("user_data_url");
        let dvr = DataVerificationRequest::from_value(v).unwrap();
        assert!(dvr.user_data_url.is_none());
        assert!(!dvr.serialize().unwrap().contains("user_data_url"));
    }

    #[test]
    fn unknown_zkvm_is_rejected_by_name() {
        let mut v = sample_value();
        v["zkvm"] = json!("valida");
        assert!(matches!(
            DataVerificationRequest::from_value(v),
            Err(ZkPassError::InvalidZkVmName(name)) if name == "valida"
        ));
    }

    #[test]
    fn key_reference_with_both_variants_is_malformed() {
        let mut v = sample_value();
        v["dvr_verifying_key"] = json!({
            "PublicKey": {"x": "AAAA", "y": "BBBB"},
            "KeysetEndpoint": {"jku": "https://x", "kid": "k"}
        });
        assert!(matches!(
            DataVerificationRequest::from_value(v),
            Err(ZkPassError::MalformedDvr(_))
        ));
    }

    #[test]
    fn empty_kid_is_malformed() {
        let mut v = sample_value();
        v["user_data_verifying_key"] = json!({"KeysetEndpoint": {"jku": "https://x", "kid": ""}});
        match DataVerificationRequest::from_value(v) {
            Err(ZkPassError::MalformedDvr(msg)) => assert!(msg.starts_with("user_data_verifying_key")),
            other => panic!("expected MalformedDvr, got {other:?}"),
        }
    }

    #[test]
    fn non_object_input_is_malformed() {
        assert!(matches!(
            DataVerificationRequest::from_json("[1,2]"),
            Err(ZkPassError::MalformedDvr(_))
        ));
        assert!(matches!(
            DataVerificationRequest::from_json("{not json"),
            Err(ZkPassError::MalformedDvr(_))
        ));
    }

    #[test]
    fn structured_query_is_stored_canonically() {
        let mut a = sample_value();
        a["query"] = json!([{"output": {"b": 1, "a": 2}}]);
        let mut b = sample_value();
        b["query"] = json!([{"output": {"a": 2, "b": 1}}]);
        let da = DataVerificationRequest::from_value(a).unwrap();
        let db = DataVerificationRequest::from_value(b).unwrap();
        assert_eq!(da.query, r#"[{"output":{"a":2,"b":1}}]"#);
        assert_eq!(da.digest().unwrap(), db.digest().unwrap());
    }

    #[test]
    fn scalar_query_is_malformed() {
        let mut v = sample_value();
        v["query"] = json!(7);
        assert!(matches!(
            DataVerificationRequest::from_value(v),
            Err(ZkPassError::MalformedDvr(_))
        ));
    }

    #[test]
    fn digest_ignores_field_order_and_explicit_null() {
        let reordered = r#"{
            "dvr_verifying_key": {"PublicKey": {"y": "BBBB", "x": "AAAA"}},
            "user_data_verifying_key": {"KeysetEndpoint": {"kid": "k-1", "jku": "https://issuer.example/jwks.json"}},
            "user_data_url": "https://issuer.example/user-data",
            "query": "[{\"assign\":{\"ok\":{\"==\":[{\"dvar\":\"lab.ID\"},\"QH801874\"]}}},{\"output\":{\"result\":{\"lvar\":\"ok\"}}}]",
            "query_method_ver": "8ac1f0",
            "query_engine_ver": "0.3.0",
            "dvr_id": "0e6a3a68-3b4d-4b57-8a8a-2d2f5f1c2b11",
            "dvr_title": "Blood Test Verification",
            "zkvm": "r0"
        }"#;
        let a = sample();
        let b = DataVerificationRequest::from_json(reordered).unwrap();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let mut without_url = sample_value();
        without_url.as_object_mut().unwrap().remove("user_data_url");
        let mut null_url = sample_value();
        null_url["user_data_url"] = Value::Null;
        assert_eq!(
            DataVerificationRequest::from_value(without_url).unwrap().digest().unwrap(),
            DataVerificationRequest::from_value(null_url).unwrap().digest().unwrap()
        );
    }

    #[test]
    fn any_field_change_changes_digest() {
        let base = sample().digest().unwrap();
        let mut d = sample();
        d.dvr_title.push('!');
        assert_ne!(d.digest().unwrap(), base);
        let mut d = sample();
        d.zkvm = ZkVm::Sp1;
        assert_ne!(d.digest().unwrap(), base);
    }

    #[test]
    fn serialize_then_deserialize_is_identity() {
        let dvr = sample();
        let text = dvr.serialize().unwrap();
        assert_eq!(DataVerificationRequest::deserialize(&text).unwrap(), dvr);
    }
}
