//! zkPass client configuration.
//!
//! Points the client at a proving service and carries the caller's API
//! credentials. Defaults target the public playground service. Override via
//! environment variables or explicit construction for local testing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;
use zeroize::Zeroizing;
use zkpass_core::{ZkPassError, ZkVm};

const DEFAULT_SERVICE_URL: &str = "https://playground-zkpass.ssi.id";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_JWKS_CACHE_SECS: u64 = 300;
const DEFAULT_PROOF_TTL_SECS: u64 = 600;

/// API credentials for the proving service.
///
/// Custom `Debug` implementation redacts the secret.
#[derive(Clone)]
pub struct ApiKey {
    pub key: String,
    pub secret: Zeroizing<String>,
}

impl ApiKey {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// `base64(key:secret)`, the HTTP Basic credential.
    pub fn basic_credential(&self) -> Zeroizing<String> {
        let pair = Zeroizing::new(format!("{}:{}", self.key, self.secret.as_str()));
        Zeroizing::new(STANDARD.encode(pair.as_bytes()))
    }

    /// The full `Authorization` header value.
    pub fn authorization(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("Basic {}", self.basic_credential().as_str()))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for connecting to a zkPass proving service.
#[derive(Debug, Clone)]
pub struct ZkPassConfig {
    /// Service base URL, always with a trailing slash.
    pub service_url: Url,
    /// Required for proof generation only.
    pub api_key: Option<ApiKey>,
    pub zkvm: ZkVm,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// How long resolved keyset keys stay cached.
    pub jwks_cache_secs: u64,
    /// TTL a Verifier applies to proofs, in seconds. Zero disables expiry.
    pub proof_ttl_secs: u64,
}

impl ZkPassConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ZKPASS_SERVICE_URL` (default: `https://playground-zkpass.ssi.id`)
    /// - `ZKPASS_API_KEY`, `ZKPASS_API_SECRET` (optional, both or neither)
    /// - `ZKPASS_ZKVM` (default: `r0`)
    /// - `ZKPASS_TIMEOUT_SECS` (default: 60)
    /// - `ZKPASS_JWKS_CACHE_SECS` (default: 300)
    /// - `ZKPASS_PROOF_TTL_SECS` (default: 600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("ZKPASS_SERVICE_URL").unwrap_or_else(|| DEFAULT_SERVICE_URL.into());
        let service_url = parse_service_url("ZKPASS_SERVICE_URL", &raw_url)?;

        let api_key = match (lookup("ZKPASS_API_KEY"), lookup("ZKPASS_API_SECRET")) {
            (Some(key), Some(secret)) => Some(ApiKey::new(key, secret)),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteApiKey),
        };

        let zkvm = match lookup("ZKPASS_ZKVM") {
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::InvalidZkVm(name.clone()))?,
            None => ZkVm::default(),
        };

        Ok(Self {
            service_url,
            api_key,
            zkvm,
            timeout_secs: env_u64(&lookup, "ZKPASS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            jwks_cache_secs: env_u64(&lookup, "ZKPASS_JWKS_CACHE_SECS", DEFAULT_JWKS_CACHE_SECS)?,
            proof_ttl_secs: env_u64(&lookup, "ZKPASS_PROOF_TTL_SECS", DEFAULT_PROOF_TTL_SECS)?,
        })
    }

    /// Create a configuration pointing at a local service (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be parsed.
    pub fn local(port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            service_url: parse_service_url("localhost", &format!("http://127.0.0.1:{port}"))?,
            api_key: None,
            zkvm: ZkVm::default(),
            timeout_secs: 5,
            jwks_cache_secs: DEFAULT_JWKS_CACHE_SECS,
            proof_ttl_secs: DEFAULT_PROOF_TTL_SECS,
        })
    }

    /// Point at `url` instead, e.g. a mock server's URI.
    pub fn with_service_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.service_url = parse_service_url("service_url", url)?;
        Ok(self)
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_zkvm(mut self, zkvm: ZkVm) -> Self {
        self.zkvm = zkvm;
        self
    }

    /// Resolve `path` against the service base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.service_url
            .join(path)
            .map_err(|e| ConfigError::InvalidUrl(path.to_string(), e.to_string()))
    }
}

fn parse_service_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            "not a base URL".to_string(),
        ));
    }
    // `join` replaces the last path segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            var: var.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: String, value: String },
    #[error("ZKPASS_API_KEY and ZKPASS_API_SECRET must be set together")]
    IncompleteApiKey,
    #[error("ZKPASS_ZKVM names an unknown zkVM: {0:?}")]
    InvalidZkVm(String),
}

impl From<ConfigError> for ZkPassError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidZkVm(name) => ZkPassError::InvalidZkVmName(name),
            other => ZkPassError::Config(other.to_string()),
        }
    }
}
