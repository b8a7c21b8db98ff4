//! Configuration types for the updater
//!
//! Everything here is built once at startup, validated, and then passed
//! by value into the engine. Nothing is mutated afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Prefix Route 53 puts in front of hosted zone ids in some responses
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Longest accepted poll interval (one week)
pub const MAX_POLL_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Main updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// The managed domain and its polling schedule
    pub domain: ManagedDomain,

    /// Echo service settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Hosted zone provider credentials
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with default resolver and engine settings
    pub fn new(domain: ManagedDomain, provider: ProviderConfig) -> Self {
        Self {
            domain,
            resolver: ResolverConfig::default(),
            provider,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.domain.validate()?;
        self.resolver.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// The domain this process keeps up to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedDomain {
    /// Fully-qualified record name, trailing dot optional
    pub name: String,

    /// Hosted zone id, either `Z123` or `/hostedzone/Z123`
    pub hosted_zone_id: String,

    /// Base interval between checks (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Plus/minus bound applied to every sleep (in seconds)
    #[serde(default = "default_jitter_secs")]
    pub jitter_secs: u64,
}

impl ManagedDomain {
    /// Create a managed domain with the default schedule (60s ± 5s)
    pub fn new(name: impl Into<String>, hosted_zone_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosted_zone_id: hosted_zone_id.into(),
            poll_interval_secs: default_poll_interval_secs(),
            jitter_secs: default_jitter_secs(),
        }
    }

    /// Set the base poll interval
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Set the jitter bound
    pub fn with_jitter_secs(mut self, secs: u64) -> Self {
        self.jitter_secs = secs;
        self
    }

    /// Hosted zone id without the `/hostedzone/` prefix
    pub fn zone_id(&self) -> &str {
        let id = self.hosted_zone_id.trim();
        id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(id)
    }

    /// Base poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Jitter bound
    pub fn jitter(&self) -> Duration {
        Duration::from_secs(self.jitter_secs)
    }

    /// Validate the managed domain
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.name)?;

        let zone_id = self.zone_id();
        if zone_id.is_empty() {
            return Err(Error::config("Hosted zone ID cannot be empty"));
        }
        if zone_id.contains('/') {
            return Err(Error::config(format!(
                "Hosted zone ID is malformed: {}",
                self.hosted_zone_id
            )));
        }

        if self.poll_interval_secs == 0 {
            return Err(Error::config("Poll interval must be > 0"));
        }
        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(Error::config(format!(
                "Poll interval ({}s) cannot exceed {}s",
                self.poll_interval_secs, MAX_POLL_INTERVAL_SECS
            )));
        }

        if self.jitter_secs > self.poll_interval_secs {
            return Err(Error::config(format!(
                "Jitter ({}s) cannot exceed the poll interval ({}s)",
                self.jitter_secs, self.poll_interval_secs
            )));
        }

        Ok(())
    }
}

/// Validate that a string is a usable record name
///
/// Basic RFC 1035 checks plus the underscore and leading `*` label that
/// Route 53 accepts.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label == "*" && index == 0 {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Echo service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Host whose `ipv4.` and `ipv6.` subdomains echo the caller's address
    #[serde(default = "default_echo_host")]
    pub echo_host: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl ResolverConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<()> {
        if self.echo_host.is_empty() {
            return Err(Error::config("Echo host cannot be empty"));
        }
        if self.echo_host.contains("://") || self.echo_host.contains('/') {
            return Err(Error::config(format!(
                "Echo host must be a bare host name, got: {}",
                self.echo_host
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("HTTP timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            echo_host: default_echo_host(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Route 53 provider configuration
///
/// The Debug implementation does NOT expose the secret key or session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// AWS access key id
    pub access_key_id: String,

    /// AWS secret access key
    pub secret_access_key: String,

    /// Optional session token for temporary credentials
    #[serde(default)]
    pub session_token: Option<String>,

    /// Endpoint override (e.g. a local mock); defaults to the public API
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Read normally but only log the change batches that would be sent
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    /// Create a provider configuration from static credentials
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            endpoint: None,
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.is_empty() {
            return Err(Error::config("AWS access key ID cannot be empty"));
        }
        if self.secret_access_key.is_empty() {
            return Err(Error::config("AWS secret access key cannot be empty"));
        }
        if let Some(endpoint) = &self.endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            return Err(Error::config(format!(
                "Provider endpoint must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of retry attempts for a retryable provider failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay before the first retry (in seconds); doubles on every attempt
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Upper bound for the doubled retry delay (in seconds)
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        if self.max_retry_delay_secs < self.retry_delay_secs {
            return Err(Error::config(format!(
                "Maximum retry delay ({}s) is below the initial retry delay ({}s)",
                self.max_retry_delay_secs, self.retry_delay_secs
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_jitter_secs() -> u64 {
    5
}

fn default_echo_host() -> String {
    "icanhazip.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_max_retry_delay_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}
