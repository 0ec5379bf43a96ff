//! # zkpass-dvr: Data Verification Requests
//!
//! The DVR is the Verifier's signed question. This crate owns its shape and
//! every transformation applied to it:
//!
//! - [`DataVerificationRequest`]: the model, JSON parsing with structural
//!   validation, canonical serialization, and the SHA-256 digest.
//! - [`DvrBuilder`]: assembly by the Verifier.
//! - DVR tokens: ES256 signing with an optional JWKS hint, verification,
//!   and extraction of the key reference from a token.
//! - [`UserDataTokens`]: the tagged map of Issuer-signed user data tokens
//!   the Holder submits alongside a DVR.

pub mod builder;
pub mod request;
pub mod token;
pub mod user_data;

pub use builder::DvrBuilder;
pub use request::DataVerificationRequest;
pub use token::{decode_dvr_token_unverified, dvr_key_reference_from_token};
pub use user_data::{sign_user_data, UserDataTokens, DEFAULT_USER_DATA_TAG};
