//! # zkpass-protocol: Holder and Verifier Orchestration
//!
//! The two protocol sides, written against the collaborator traits so the
//! same code runs over the HTTP client or the in-process mock engine.
//!
//! ## Architecture
//!
//! - **Holder** (`holder.rs`): [`HolderSession`] encrypts the DVR token and
//!   user data tokens for the proving engine and requests a proof.
//!
//! - **Verifier** (`verifier.rs`): [`ProofVerifier`] runs the ordered
//!   verification gates and delegates the cryptographic check to the
//!   engine only after every metadata gate passes.
//!
//! - **Lookup** (`lookup.rs`): [`DvrLookup`] holds issued DVRs and hands
//!   each one out at most once.
//!
//! - **Validator** (`validator.rs`): [`MetadataValidator`] is the
//!   Verifier's strategy for expected metadata;
//!   [`LookupMetadataValidator`] backs it with a [`DvrLookup`].
//!
//! ## Crate Policy
//!
//! - No retries. A caller may retry a transient `ProofGeneration` failure;
//!   nothing here retries past a trust check.
//! - No HTTP. Networked collaborators come from `zkpass-client`.

pub mod holder;
pub mod lookup;
pub mod validator;
pub mod verifier;

pub use holder::{HolderSession, HolderState};
pub use lookup::{DvrLookup, InMemoryDvrLookup};
pub use validator::{ExpectedMetadata, LookupMetadataValidator, MetadataValidator};
pub use verifier::{check_expiry, ProofVerifier, VerificationSession, VerifierState};
