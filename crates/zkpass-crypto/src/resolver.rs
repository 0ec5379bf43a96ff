//! # Key Resolution
//!
//! A [`KeyReference`] names a verifying key; a [`KeyResolver`] turns it into
//! a concrete [`PublicKey`]. Inline keys resolve without I/O. Keyset
//! references need a JWKS fetch, which lives in the HTTP client crate; this
//! module provides the trait and the two resolvers that need no network.
//!
//! Resolution fails closed. A keyset reference whose `kid` is empty or
//! absent from the keyset is a `KeyNotFound` error, never a fallback to some
//! other key. Resolvers do not retry.

use std::collections::HashMap;

use async_trait::async_trait;
use zkpass_core::{KeyReference, KeysetEndpoint, PublicKey, ZkPassError};

/// Resolves a key reference into a public key.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, key_ref: &KeyReference) -> Result<PublicKey, ZkPassError>;
}

/// Resolve an inline key: the only possible failure is malformed text.
pub fn resolve_inline(key: &PublicKey) -> Result<PublicKey, ZkPassError> {
    key.validate()?;
    Ok(key.clone())
}

/// Resolves inline keys only.
///
/// Keyset references fail with `KeysetFetch`, since this resolver has no
/// transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineKeyResolver;

#[async_trait]
impl KeyResolver for InlineKeyResolver {
    async fn resolve(&self, key_ref: &KeyReference) -> Result<PublicKey, ZkPassError> {
        match key_ref {
            KeyReference::InlinePublicKey(key) => resolve_inline(key),
            KeyReference::KeysetEndpoint(ep) => Err(ZkPassError::KeysetFetch {
                jku: ep.jku.clone(),
                reason: "this resolver cannot fetch keysets".into(),
            }),
        }
    }
}

/// Resolves keyset references from a fixed, preloaded table.
///
/// Used where keysets are provisioned out of band (pinned configuration,
/// tests) rather than fetched.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<KeysetEndpoint, PublicKey>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the key published at `(jku, kid)`.
    pub fn with_key(mut self, jku: impl Into<String>, kid: impl Into<String>, key: PublicKey) -> Self {
        self.keys.insert(KeysetEndpoint::new(jku, kid), key);
        self
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, key_ref: &KeyReference) -> Result<PublicKey, ZkPassError> {
        match key_ref {
            KeyReference::InlinePublicKey(key) => resolve_inline(key),
            KeyReference::KeysetEndpoint(ep) => {
                self.keys
                    .get(ep)
                    .cloned()
                    .ok_or_else(|| ZkPassError::KeyNotFound {
                        jku: ep.jku.clone(),
                        kid: ep.kid.clone(),
                    })
            }
        }
    }
}
