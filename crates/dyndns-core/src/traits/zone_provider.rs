// # Zone Provider Trait
//
// Defines the interface to a DNS hosting provider's record-set API.
//
// ## Implementations
//
// - AWS Route 53: `dyndns-provider-route53` crate
//
// Providers only translate between these types and the wire. Matching the
// managed domain, picking values and deciding whether to write all happen in
// `Zone` and `DdnsEngine`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::traits::address_resolver::IpFamily;

/// TTL written for every managed record (in seconds)
pub const MANAGED_TTL: u32 = 300;

/// Record types this updater manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Parse a provider type string; `None` for types this updater ignores
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            _ => None,
        }
    }

    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// The address family stored in this record type
    pub fn family(self) -> IpFamily {
        match self {
            RecordType::A => IpFamily::V4,
            RecordType::Aaaa => IpFamily::V6,
        }
    }

    /// The record type that stores a family
    pub fn for_family(family: IpFamily) -> Self {
        match family {
            IpFamily::V4 => RecordType::A,
            IpFamily::V6 => RecordType::Aaaa,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Record name, usually with a trailing dot
    pub name: String,
    /// Record type as reported by the provider (`A`, `AAAA`, `MX`, ...)
    pub record_type: String,
    /// TTL, absent for alias records
    pub ttl: Option<u32>,
    /// Resource record values; empty for alias records
    pub values: Vec<String>,
}

/// Change action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create if absent, replace if present
    Upsert,
}

impl ChangeAction {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Upsert => "UPSERT",
        }
    }
}

/// One change inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub value: String,
}

/// A batch of changes submitted in one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub comment: String,
    pub changes: Vec<Change>,
}

/// What the provider reported after accepting a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReceipt {
    /// Provider change id
    pub id: String,
    /// Provider status (e.g. `PENDING`)
    pub status: String,
}

/// Trait for DNS hosting provider implementations
///
/// # Contract
///
/// - `list_record_sets` returns every record set of the zone, following the
///   provider's pagination. No server-side filtering is assumed.
/// - `change_record_sets` submits the batch in a single call. Whatever
///   atomicity the provider gives one batch is inherited; no cross-call
///   transaction is attempted.
/// - No retries and no backoff: return the error, the engine decides.
/// - Secrets never appear in logs or error messages.
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// List all record sets of a hosted zone
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>, crate::Error>;

    /// Submit a change batch to a hosted zone
    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeReceipt, crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
