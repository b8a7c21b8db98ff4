// # HTTP Address Resolver
//
// This crate discovers the caller's public addresses through a plaintext
// "what is my IP" echo service.
//
// ## Architecture
//
// One GET per family against `http://ipv4.<echo-host>/` and
// `http://ipv6.<echo-host>/`. The family-specific host only has records of
// that family, so the connection itself selects IPv4 or IPv6. The trimmed
// body is the address.
//
// ## Failure policy
//
// A network without IPv6 simply cannot connect to the `ipv6.` host, so
// refused or unreachable connections, non-success statuses and empty bodies
// all mean "family unavailable" (`Ok(None)`). Structural failures are
// reported as retryable `Error::Network`: the echo host name not resolving,
// and timeouts.

use dyndns_core::config::ResolverConfig;
use dyndns_core::traits::{AddressResolver, IpFamily};
use dyndns_core::{Error, Result};

use std::time::Duration;

use tracing::{debug, warn};

/// Address resolver backed by an HTTP echo service
pub struct HttpAddressResolver {
    /// URL answering with the caller's IPv4 address
    ipv4_url: String,

    /// URL answering with the caller's IPv6 address
    ipv6_url: String,

    /// Per-request timeout, also applied to the host name lookup
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver for an echo host (e.g. "icanhazip.com")
    pub fn new(echo_host: &str, timeout: Duration) -> Result<Self> {
        Self::with_urls(
            format!("http://{}.{}/", IpFamily::V4.label(), echo_host),
            format!("http://{}.{}/", IpFamily::V6.label(), echo_host),
            timeout,
        )
    }

    /// Create a resolver with explicit per-family URLs
    pub fn with_urls(
        ipv4_url: impl Into<String>,
        ipv6_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            timeout,
            client,
        })
    }

    /// Create a resolver from the resolver configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        Self::new(&config.echo_host, config.timeout())
    }

    /// URL queried for a family
    pub fn url(&self, family: IpFamily) -> &str {
        match family {
            IpFamily::V4 => &self.ipv4_url,
            IpFamily::V6 => &self.ipv6_url,
        }
    }

    /// Resolve the echo host name ahead of the request
    ///
    /// Once the name resolves, a failed connection means the family is not
    /// routable from here. A name that does not resolve is a DNS problem.
    async fn resolve_host(&self, family: IpFamily, url: &str) -> Result<()> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::config(format!("Invalid echo URL {}: {}", url, e)))?;

        // IP literal hosts need no lookup
        let Some(host) = parsed.domain() else {
            return Ok(());
        };
        let port = parsed.port_or_known_default().unwrap_or(80);

        match tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::network(format!(
                "Could not resolve {} echo host {}: {}",
                family, host, e
            ))),
            Err(_) => Err(Error::network(format!(
                "Timed out resolving {} echo host {}",
                family, host
            ))),
        }
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self, family: IpFamily) -> Result<Option<String>> {
        let url = self.url(family);
        self.resolve_host(family, url).await?;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(Error::network(format!(
                    "Timed out fetching {} address from {}",
                    family, url
                )));
            }
            Err(e) => {
                debug!("{} lookup against {} failed: {}", family, url, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            warn!(
                "{} lookup against {} returned HTTP {}",
                family,
                url,
                response.status()
            );
            return Ok(None);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(Error::network(format!(
                    "Timed out reading {} address from {}",
                    family, url
                )));
            }
            Err(e) => {
                warn!("Failed to read {} lookup response: {}", family, e);
                return Ok(None);
            }
        };

        let address = body.trim();
        if address.is_empty() {
            debug!("{} lookup against {} returned an empty body", family, url);
            return Ok(None);
        }

        Ok(Some(address.to_string()))
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
