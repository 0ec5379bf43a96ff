//! # zkpass-crypto: JOSE Primitives and Key Resolution
//!
//! - **JWS** (ES256) signing and verification of `{"data": ...}` payloads.
//! - **JWE** (ECDH-ES + A256GCM) encryption for Holder-to-engine transport.
//! - **Nested tokens**: JWE(JWS(payload)) wrapping and unwrapping.
//! - **PEM** handling: private keys in zeroizing memory, public keys via
//!   [`zkpass_core::PublicKey`].
//! - **Key resolution**: the [`KeyResolver`] trait plus resolvers that need
//!   no network.
//!
//! ## Crate Policy
//!
//! - Depends only on `zkpass-core` internally.
//! - No mocking of cryptographic operations in tests. All tests generate real
//!   P-256 keys.
//! - Private key material is never logged or serialized.

pub mod jose;
pub mod nested;
pub mod pem;
pub mod resolver;

pub use jose::{
    decode_jws_unverified, decrypt_jwe_token, encrypt_data_to_jwe_token, sign_data_to_jws_token,
    sign_jws_claims, verify_jws_claims, verify_jws_token, MalformedToken, TokenHeader,
    UnverifiedJws, VerifiedJws, DATA_CLAIM,
};
pub use nested::{
    decrypt_to_jws_token, encrypt_jws_token, tokenize_data, verify_data_nested_token,
    VerifiedNestedToken,
};
pub use pem::{generate_key_pair, normalize_pem, PrivateKeyPem};
pub use resolver::{resolve_inline, InlineKeyResolver, KeyResolver, StaticKeyResolver};
