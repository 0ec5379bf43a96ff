//! Builder for [`DataVerificationRequest`].
//!
//! The Verifier builds one DVR per verification session. The id defaults to
//! a fresh UUID and the zkVM to `r0`; the engine versions, the query, and
//! both key references must be supplied.

use serde_json::Value;
use zkpass_core::canonical::canonical_json_string;
use zkpass_core::{DvrId, KeyReference, QueryEngineVersionInfo, ZkPassError, ZkVm};

use crate::request::DataVerificationRequest;

#[derive(Debug, Clone)]
enum QueryInput {
    Text(String),
    Structured(Value),
}

/// Incrementally assembles a DVR.
#[derive(Debug, Clone)]
pub struct DvrBuilder {
    dvr_title: String,
    dvr_id: Option<DvrId>,
    zkvm: ZkVm,
    versions: Option<QueryEngineVersionInfo>,
    query: Option<QueryInput>,
    user_data_url: Option<String>,
    user_data_verifying_key: Option<KeyReference>,
    dvr_verifying_key: Option<KeyReference>,
}

impl DvrBuilder {
    pub fn new(dvr_title: impl Into<String>) -> Self {
        Self {
            dvr_title: dvr_title.into(),
            dvr_id: None,
            zkvm: ZkVm::default(),
            versions: None,
            query: None,
            user_data_url: None,
            user_data_verifying_key: None,
            dvr_verifying_key: None,
        }
    }

    pub fn dvr_id(mut self, id: impl Into<DvrId>) -> Self {
        self.dvr_id = Some(id.into());
        self
    }

    pub fn zkvm(mut self, zkvm: ZkVm) -> Self {
        self.zkvm = zkvm;
        self
    }

    /// Engine and method versions, as reported by the zkVM backend.
    pub fn versions(mut self, versions: QueryEngineVersionInfo) -> Self {
        self.versions = Some(versions);
        self
    }

    /// Query as JSON text, stored verbatim.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(QueryInput::Text(query.into()));
        self
    }

    /// Query as a JSON value, stored as canonical text.
    pub fn query_value(mut self, query: Value) -> Self {
        self.query = Some(QueryInput::Structured(query));
        self
    }

    pub fn user_data_url(mut self, url: impl Into<String>) -> Self {
        self.user_data_url = Some(url.into());
        self
    }

    pub fn user_data_verifying_key(mut self, key: impl Into<KeyReference>) -> Self {
        self.user_data_verifying_key = Some(key.into());
        self
    }

    pub fn dvr_verifying_key(mut self, key: impl Into<KeyReference>) -> Self {
        self.dvr_verifying_key = Some(key.into());
        self
    }

    /// Assemble and validate the DVR.
    ///
    /// # Errors
    ///
    /// `MalformedDvr` naming the first missing or invalid field.
    pub fn build(self) -> Result<DataVerificationRequest, ZkPassError> {
        let versions = self.versions.ok_or_else(|| missing("query engine versions"))?;
        let query = match self.query.ok_or_else(|| missing("query"))? {
            QueryInput::Text(text) => text,
            QueryInput::Structured(value) => canonical_json_string(&value)?,
        };
        let dvr = DataVerificationRequest {
            zkvm: self.zkvm,
            dvr_title: self.dvr_title,
            dvr_id: self.dvr_id.unwrap_or_default(),
            query_engine_ver: versions.query_engine_ver,
            query_method_ver: versions.query_method_ver,
            query,
            user_data_url: self.user_data_url,
            user_data_verifying_key: self
                .user_data_verifying_key
                .ok_or_else(|| missing("user_data_verifying_key"))?,
            dvr_verifying_key: self
                .dvr_verifying_key
                .ok_or_else(|| missing("dvr_verifying_key"))?,
        };
        dvr.validate()?;
        Ok(dvr)
    }
}

fn missing(field: &str) -> ZkPassError {
    ZkPassError::MalformedDvr(format!("missing {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zkpass_core::{KeysetEndpoint, PublicKey};

    fn versions() -> QueryEngineVersionInfo {
        QueryEngineVersionInfo {
            query_engine_ver: "0.3.0".into(),
            query_method_ver: "8ac1f0".into(),
        }
    }

    fn complete() -> DvrBuilder {
        DataVerificationRequest::builder("KYC Age Check")
            .versions(versions())
            .query_value(json!([{"output": {"result": true}}]))
            .user_data_verifying_key(KeysetEndpoint::new("https://issuer.example/jwks.json", "k-1"))
            .dvr_verifying_key(PublicKey::new("AAAA", "BBBB"))
    }

    #[test]
    fn builds_with_defaults() {
        let dvr = complete().build().unwrap();
        assert_eq!(dvr.zkvm, ZkVm::R0);
        assert!(!dvr.dvr_id.as_str().is_empty());
        assert!(dvr.user_data_url.is_none());
        assert_eq!(dvr.query, r#"[{"output":{"result":true}}]"#);
    }

    #[test]
    fn fresh_ids_per_build() {
        let a = complete().build().unwrap();
        let b = complete().build().unwrap();
        assert_ne!(a.dvr_id, b.dvr_id);
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn same_inputs_same_digest_as_parsed() {
        let built = complete().dvr_id("fixed-id").zkvm(ZkVm::Sp1).build().unwrap();
        let parsed = DataVerificationRequest::from_value(json!({
            "zkvm": "sp1",
            "dvr_id": "fixed-id",
            "dvr_title": "KYC Age Check",
            "query_engine_ver": "0.3.0",
            "query_method_ver": "8ac1f0",
            "query": [{"output": {"result": true}}],
            "user_data_verifying_key": {"KeysetEndpoint": {"jku": "https://issuer.example/jwks.json", "kid": "k-1"}},
            "dvr_verifying_key": {"PublicKey": {"x": "AAAA", "y": "BBBB"}}
        }))
        .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.digest().unwrap(), parsed.digest().unwrap());
    }

    #[test]
    fn missing_pieces_are_named() {
        let err = DataVerificationRequest::builder("t")
            .versions(versions())
            .query("[]")
            .user_data_verifying_key(PublicKey::new("AAAA", "BBBB"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("dvr_verifying_key"));

        let err = DataVerificationRequest::builder("t").build().unwrap_err();
        assert!(err.to_string().contains("versions"));
    }

    #[test]
    fn float_in_structured_query_is_rejected() {
        let err = complete().query_value(json!({"limit": 0.5})).build().unwrap_err();
        assert!(matches!(err, ZkPassError::Canonicalization(_)));
    }
}
