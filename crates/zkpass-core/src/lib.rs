//! # zkpass-core: Foundational Types for the DVR Protocol
//!
//! This crate is the leaf of the workspace DAG. It defines the types that
//! every other crate agrees on: how a Data Verification Request is turned
//! into canonical bytes, how those bytes are digested, how verifying keys
//! are referenced, which zkVM backends exist, and which errors the protocol
//! can raise.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` is the only digest input.** `sha256_digest()` accepts
//!    `&CanonicalBytes`, never raw bytes. The same logical DVR therefore digests
//!    identically no matter how it was constructed or in which order its JSON
//!    fields arrived.
//!
//! 2. **`KeyReference` is a sum type.** A verifying key is either carried
//!    inline or referenced through a JWKS endpoint. Consumers `match`
//!    exhaustively; there is no loosely-shaped "maybe jku, maybe x/y" object.
//!
//! 3. **One error taxonomy.** [`ZkPassError`] holds every structural,
//!    trust, key-resolution, and transport failure of the protocol. Every
//!    variant has a stable code so callers can branch without string matching.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkpass-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod keys;
pub mod temporal;
pub mod zkvm;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, DvrDigest};
pub use error::{CanonicalizationError, ZkPassError};
pub use identity::DvrId;
pub use keys::{KeyReference, KeysetEndpoint, PublicKey};
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
pub use zkvm::{QueryEngineVersionInfo, ZkVm};
