//! # JWKS Key Resolution
//!
//! Resolves `KeysetEndpoint { jku, kid }` references by fetching the JSON
//! keyset at `jku` and selecting the entry whose `kid` matches. Entries
//! carry the two-part PEM body encoding of [`PublicKey`] in `x`/`y`.
//!
//! Both keyset shapes seen in deployments are accepted: the standard
//! `{"keys": [...]}` document and a bare array of entries.
//!
//! ## Cache
//!
//! Resolved keys are cached per `(jku, kid)` for a fixed duration. Expired
//! entries are evicted when they are next looked up, or all at once by
//! [`JwksKeyResolver::prune_expired`]. A rotated key can be dropped early
//! with [`JwksKeyResolver::invalidate`].
//!
//! ## Failure Modes
//!
//! - transport error, non-2xx status or unparseable body: `KeysetFetch`
//! - no entry with the requested `kid`: `KeyNotFound`
//!
//! Nothing here retries and nothing falls back to another key.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zkpass_core::{KeyReference, KeysetEndpoint, PublicKey, ZkPassError};
use zkpass_crypto::{resolve_inline, KeyResolver};

/// One keyset entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    pub x: String,
    pub y: String,
    pub kid: String,
    /// Attestation JWT over `{x, y}`, present on proving service keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl Jwk {
    /// An EC P-256 entry for `key`.
    pub fn ec(kid: impl Into<String>, key: &PublicKey) -> Self {
        Self {
            kty: Some("EC".into()),
            crv: Some("P-256".into()),
            x: key.x.clone(),
            y: key.y.clone(),
            kid: kid.into(),
            jwt: None,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.x.clone(), self.y.clone())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeysetDocument {
    Set { keys: Vec<Jwk> },
    Bare(Vec<Jwk>),
}

impl KeysetDocument {
    fn into_keys(self) -> Vec<Jwk> {
        match self {
            Self::Set { keys } | Self::Bare(keys) => keys,
        }
    }
}

/// Parse a keyset body in either accepted shape.
pub fn parse_keyset(jku: &str, body: &str) -> Result<Vec<Jwk>, ZkPassError> {
    serde_json::from_str::<KeysetDocument>(body)
        .map(KeysetDocument::into_keys)
        .map_err(|e| ZkPassError::KeysetFetch {
            jku: jku.to_string(),
            reason: format!("unparseable keyset: {e}"),
        })
}

/// Find `kid` in a keyset.
pub fn find_key<'a>(jku: &str, keys: &'a [Jwk], kid: &str) -> Result<&'a Jwk, ZkPassError> {
    keys.iter()
        .find(|k| !kid.is_empty() && k.kid == kid)
        .ok_or_else(|| ZkPassError::KeyNotFound {
            jku: jku.to_string(),
            kid: kid.to_string(),
        })
}

/// GET a keyset document.
pub async fn fetch_keyset(http: &reqwest::Client, jku: &str) -> Result<Vec<Jwk>, ZkPassError> {
    let fetch_err = |reason: String| ZkPassError::KeysetFetch {
        jku: jku.to_string(),
        reason,
    };
    let resp = http
        .get(jku)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {status}")));
    }
    let body = resp.text().await.map_err(|e| fetch_err(e.to_string()))?;
    let keys = parse_keyset(jku, &body)?;
    debug!(jku, entries = keys.len(), "fetched keyset");
    Ok(keys)
}

struct CachedKey {
    key: PublicKey,
    expires_at: Instant,
}

/// Resolves key references over HTTP, caching keyset keys.
pub struct JwksKeyResolver {
    http: reqwest::Client,
    ttl: Duration,
    cache: Mutex<HashMap<KeysetEndpoint, CachedKey>>,
}

impl JwksKeyResolver {
    /// Keys stay cached for `cache_ttl`; a zero duration disables caching.
    pub fn new(http: reqwest::Client, cache_ttl: Duration) -> Self {
        Self {
            http,
            ttl: cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached key for one endpoint.
    pub fn invalidate(&self, endpoint: &KeysetEndpoint) {
        self.cache.lock().remove(endpoint);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Evict every expired entry. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.cache.lock();
        let before = cache.len();
        cache.retain(|_, entry| entry.expires_at > now);
        let pruned = before - cache.len();
        if pruned > 0 {
            debug!(pruned, "pruned expired keyset entries");
        }
        pruned
    }

    /// Number of cached entries, expired ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn cached(&self, endpoint: &KeysetEndpoint) -> Option<PublicKey> {
        let mut cache = self.cache.lock();
        match cache.get(endpoint) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.key.clone()),
            Some(_) => {
                cache.remove(endpoint);
                None
            }
            None => None,
        }
    }

    async fn resolve_endpoint(&self, endpoint: &KeysetEndpoint) -> Result<PublicKey, ZkPassError> {
        if endpoint.kid.is_empty() {
            return Err(ZkPassError::KeyNotFound {
                jku: endpoint.jku.clone(),
                kid: String::new(),
            });
        }
        if let Some(key) = self.cached(endpoint) {
            debug!(jku = %endpoint.jku, kid = %endpoint.kid, "keyset cache hit");
            return Ok(key);
        }

        let keys = fetch_keyset(&self.http, &endpoint.jku).await?;
        let key = find_key(&endpoint.jku, &keys, &endpoint.kid)?.public_key();
        key.validate()?;
        info!(jku = %endpoint.jku, kid = %endpoint.kid, "resolved keyset key");

        if !self.ttl.is_zero() {
            self.cache.lock().insert(
                endpoint.clone(),
                CachedKey {
                    key: key.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        Ok(key)
    }
}

impl std::fmt::Debug for JwksKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeyResolver")
            .field("ttl", &self.ttl)
            .field("cached", &self.cached_len())
            .finish()
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, key_ref: &KeyReference) -> Result<PublicKey, ZkPassError> {
        match key_ref {
            KeyReference::InlinePublicKey(key) => resolve_inline(key),
            KeyReference::KeysetEndpoint(ep) => self.resolve_endpoint(ep).await,
        }
    }
}
