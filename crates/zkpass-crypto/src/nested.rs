//! # Nested Tokens: JWE(JWS(payload))
//!
//! The Holder never sends a signed token to the proving engine in the clear.
//! The JWS (signed by the Issuer or the Verifier) becomes the `data` claim of
//! a JWE encrypted to the engine's key. Unwrapping reverses the two layers:
//! decrypt, then verify the inner signature.

use serde_json::Value;
use zkpass_core::{KeysetEndpoint, PublicKey, ZkPassError};

use crate::jose::{
    decrypt_jwe_token, encrypt_data_to_jwe_token, sign_data_to_jws_token, verify_jws_token,
    TokenHeader,
};
use crate::pem::PrivateKeyPem;

/// The inner payload and header of an unwrapped nested token.
#[derive(Debug, Clone)]
pub struct VerifiedNestedToken {
    pub inner_header: TokenHeader,
    pub payload: Value,
}

/// Wrap an already-signed JWS in a JWE for `encrypting_key`.
pub fn encrypt_jws_token(encrypting_key: &PublicKey, jws_token: &str) -> Result<String, ZkPassError> {
    encrypt_data_to_jwe_token(encrypting_key, Value::String(jws_token.to_string()))
}

/// Sign `data`, then encrypt the resulting JWS.
pub fn tokenize_data(
    signing_key: &PrivateKeyPem,
    encrypting_key: &PublicKey,
    data: Value,
    verifying_key_jwks: Option<&KeysetEndpoint>,
) -> Result<String, ZkPassError> {
    let jws = sign_data_to_jws_token(signing_key, data, verifying_key_jwks)?;
    encrypt_jws_token(encrypting_key, &jws)
}

/// Decrypt the outer JWE and return the inner JWS as text.
pub fn decrypt_to_jws_token(decrypting_key: &PrivateKeyPem, jwe_token: &str) -> Result<String, ZkPassError> {
    match decrypt_jwe_token(decrypting_key, jwe_token)? {
        Value::String(jws) => Ok(jws),
        other => Err(ZkPassError::Jose(format!(
            "nested token carries a {} instead of a JWS string",
            json_kind(&other)
        ))),
    }
}

/// Decrypt the outer JWE, then verify the inner JWS against `verifying_key`.
pub fn verify_data_nested_token(
    verifying_key: &PublicKey,
    decrypting_key: &PrivateKeyPem,
    jwe_token: &str,
) -> Result<VerifiedNestedToken, ZkPassError> {
    let jws = decrypt_to_jws_token(decrypting_key, jwe_token)?;
    let verified = verify_jws_token(verifying_key, &jws)?;
    Ok(VerifiedNestedToken {
        inner_header: verified.header,
        payload: verified.data,
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use josekit::jws::ES256;
    use serde_json::json;

    fn pair() -> (PrivateKeyPem, PublicKey) {
        let kp = ES256.generate_key_pair().unwrap();
        (
            PrivateKeyPem::new(String::from_utf8(kp.to_pem_private_key()).unwrap()).unwrap(),
            PublicKey::from_pem(&String::from_utf8(kp.to_pem_public_key()).unwrap()).unwrap(),
        )
    }

    #[test]
    fn tokenize_and_verify_data() {
        let (issuer_sk, issuer_pk) = pair();
        let (engine_sk, engine_pk) = pair();
        let ep = KeysetEndpoint::new("https://hostname.com/jwks", "mykey");
        let data = json!({"name": "John", "age": 30});

        let token = tokenize_data(&issuer_sk, &engine_pk, data.clone(), Some(&ep)).unwrap();
        let verified = verify_data_nested_token(&issuer_pk, &engine_sk, &token).unwrap();

        assert_eq!(verified.payload, data);
        assert_eq!(verified.inner_header.keyset_endpoint(), Some(ep));
    }

    #[test]
    fn inner_signature_is_checked() {
        let (issuer_sk, _) = pair();
        let (_, impostor_pk) = pair();
        let (engine_sk, engine_pk) = pair();
        let token = tokenize_data(&issuer_sk, &engine_pk, json!(1), None).unwrap();
        assert!(verify_data_nested_token(&impostor_pk, &engine_sk, &token).is_err());
    }

    #[test]
    fn non_string_inner_payload_is_rejected() {
        let (engine_sk, engine_pk) = pair();
        let token = encrypt_data_to_jwe_token(&engine_pk, json!({"not": "a jws"})).unwrap();
        match decrypt_to_jws_token(&engine_sk, &token) {
            Err(ZkPassError::Jose(msg)) => assert!(msg.contains("object")),
            other => panic!("expected Jose error, got {other:?}"),
        }
    }
}
