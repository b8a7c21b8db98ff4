// # dyndns-core
//
// Core library for the Route 53 dynamic DNS updater.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for discovering the public IPv4/IPv6 address
// - **ZoneProvider**: Trait for listing and changing record sets in a hosted zone
// - **Zone**: Binds a provider to the managed name (filtering, batch building)
// - **DdnsEngine**: Polling loop that diffs observed vs published and upserts
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP and API clients
// 2. **Diff First**: Only changed, known families are ever written
// 3. **Library-First**: The daemon is a thin wrapper around this crate

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use address::{AddressPair, ChangeSet};
pub use config::{DdnsConfig, EngineConfig, ManagedDomain, ProviderConfig, ResolverConfig};
pub use engine::{DdnsEngine, EngineEvent, HaltReason, Jitter, Outcome, StopReason};
pub use error::{Error, Result};
pub use traits::{AddressResolver, IpFamily, ZoneProvider};
pub use zone::Zone;
