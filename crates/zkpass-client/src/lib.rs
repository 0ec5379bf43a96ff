//! # zkpass-client: HTTP Collaborators for the DVR Protocol
//!
//! Provides the networked implementations of the protocol's collaborator
//! traits:
//!
//! - [`JwksKeyResolver`]: resolves `KeysetEndpoint` references by fetching
//!   the keyset at `jku`, with a timed per-key cache.
//! - [`ZkPassServiceClient`]: the proving service as a
//!   [`ProofEngine`](zkpass_zkp::ProofEngine). It discovers the service's
//!   attested signing and encryption keys, submits encrypted inputs for
//!   proving, and verifies proof tokens through a registered zkVM backend.
//!
//! Plus [`ZkPassConfig`] (environment configuration and API credentials)
//! and [`retry_transient`], a caller-side retry for transient transport
//! failures.
//!
//! ## Endpoint Convention
//!
//! Service paths are resolved against the configured base URL, so a
//! service mounted under a path prefix works unchanged:
//! `{base_url}/.well-known/jwks.json`, `{base_url}/v1/proof`.

pub mod config;
pub mod jwks;
pub mod retry;
pub mod service;

pub use config::{ApiKey, ConfigError, ZkPassConfig};
pub use jwks::{fetch_keyset, parse_keyset, Jwk, JwksKeyResolver};
pub use retry::{retry_transient, retry_with_policy, RetryPolicy};
pub use service::{attested_service_keyset, ServiceKeys, ZkPassServiceClient};
