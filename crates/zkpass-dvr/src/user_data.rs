//! # User Data Tokens
//!
//! The Issuer signs the Holder's data as an ES256 JWS. A DVR may query
//! several such documents, so the Holder submits them as a map from tag to
//! token; a DVR over a single document uses the empty tag. The map is
//! serialized to one JSON string before it is encrypted for the proving
//! engine.

use std::collections::BTreeMap;

use serde_json::Value;
use zkpass_core::{KeysetEndpoint, ZkPassError};
use zkpass_crypto::{sign_data_to_jws_token, PrivateKeyPem};

/// Tag used when a DVR queries a single user data document.
pub const DEFAULT_USER_DATA_TAG: &str = "";

/// User data JWS tokens keyed by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDataTokens(BTreeMap<String, String>);

impl UserDataTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single token under the default tag.
    pub fn single(token: impl Into<String>) -> Self {
        let mut tokens = Self::new();
        tokens.insert(DEFAULT_USER_DATA_TAG, token);
        tokens
    }

    pub fn insert(&mut self, tag: impl Into<String>, token: impl Into<String>) {
        self.0.insert(tag.into(), token.into());
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Combine all tokens into one JSON string.
    pub fn encode(&self) -> Result<String, ZkPassError> {
        serde_json::to_string(&self.0)
            .map_err(|e| ZkPassError::Jose(format!("user data tokens do not serialize: {e}")))
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(encoded: &str) -> Result<Self, ZkPassError> {
        serde_json::from_str(encoded)
            .map(Self)
            .map_err(|e| ZkPassError::Jose(format!("user data tokens do not parse: {e}")))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserDataTokens {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Sign user data as the Issuer.
pub fn sign_user_data(
    signing_key: &PrivateKeyPem,
    data: Value,
    verifying_key_jwks: Option<&KeysetEndpoint>,
) -> Result<String, ZkPassError> {
    sign_data_to_jws_token(signing_key, data, verifying_key_jwks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_preserve_tokens_with_quotes() {
        let tokens: UserDataTokens = [
            ("user_data_1", "t\"o\"k\"e\"n_1"),
            ("user_data_2", "t\"o\"k\"e\"n_2"),
        ]
        .into_iter()
        .collect();
        let encoded = tokens.encode().unwrap();
        assert_eq!(UserDataTokens::decode(&encoded).unwrap(), tokens);
    }

    #[test]
    fn single_uses_empty_tag() {
        let tokens = UserDataTokens::single("jws");
        assert_eq!(tokens.get(""), Some("jws"));
        assert_eq!(tokens.encode().unwrap(), r#"{"":"jws"}"#);
    }

    #[test]
    fn invalid_encoding_is_an_error() {
        assert!(UserDataTokens::decode(r#"{"key1":"value1","key2":value2}"#).is_err());
    }
}
