// # Address Resolver Trait
//
// Defines the interface for discovering the caller's public addresses.
//
// ## Implementations
//
// - HTTP echo service: `dyndns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::{AddressResolver, IpFamily};
//
// #[tokio::main]
// async fn main() -> dyndns_core::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     match resolver.resolve(IpFamily::V6).await? {
//         Some(address) => println!("public IPv6 address: {address}"),
//         None => println!("no IPv6 on this network"),
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Address family (IPv4 or IPv6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Both families, in the order they are resolved
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// Label used for subdomains and log lines (`ipv4` / `ipv6`)
    pub fn label(self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Trait for address resolver implementations
///
/// A resolver answers one question: what address does the outside world
/// see for this family right now?
///
/// # Contract
///
/// - `Ok(Some(address))`: the trimmed address as reported by the service.
///   The value is not validated as an IP literal.
/// - `Ok(None)`: the family is not available from this network
///   (connection refused or unreachable, non-success status, empty body).
///   Not an error.
/// - `Err(Error::Network)`: a structural failure (name resolution, timeout)
///   that may go away on the next attempt.
///
/// Resolvers are stateless and single-shot: no caching, no retries, no
/// background tasks. The engine owns scheduling.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current public address for a family
    async fn resolve(&self, family: IpFamily) -> Result<Option<String>, crate::Error>;

    /// Resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
