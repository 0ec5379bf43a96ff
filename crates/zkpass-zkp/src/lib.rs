//! # zkpass-zkp: Proof Tokens and Proving Engines
//!
//! ## Architecture
//!
//! - **Proof** (`proof.rs`): [`ZkPassProof`], the payload of the service
//!   signed proof token, and [`parse_proof_token`], which reads it without
//!   signature checks. The Verifier runs its gates on the extracted
//!   [`ProofMetadata`] before any signature is checked.
//!
//! - **Traits** (`traits.rs`): [`ProofEngine`] is the proving service as seen
//!   by Holders and Verifiers. [`ZkVmBackend`] verifies one zkVM's receipts.
//!
//! - **Registry** (`registry.rs`): [`ZkVmRegistry`] maps registered zkVMs to
//!   their backends; [`verify_proof_token`] is the shared service signature
//!   plus receipt check.
//!
//! - **Mock** (`mock.rs`, feature `mock`): [`MockProofEngine`] runs the whole
//!   service side in process over [`MockZkVmBackend`] receipts. No
//!   zero-knowledge guarantees.
//!
//! ## Crate Policy
//!
//! - Depends on `zkpass-core`, `zkpass-crypto` and `zkpass-dvr` internally.
//! - No HTTP here. The networked engine lives in `zkpass-client`.

#[cfg(feature = "mock")]
pub mod mock;
pub mod proof;
pub mod registry;
pub mod traits;

#[cfg(feature = "mock")]
pub use mock::{MockProofEngine, MockZkVmBackend};
pub use proof::{parse_proof_token, ProofMetadata, ZkPassProof};
pub use registry::{verify_proof_token, ZkVmRegistry};
pub use traits::{ProofEngine, VerifiedProof, ZkVmBackend};
