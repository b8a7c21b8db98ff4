//! Core traits for the updater
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressResolver`]: Discover the caller's public addresses
//! - [`ZoneProvider`]: List and change record sets in a hosted zone

pub mod address_resolver;
pub mod zone_provider;

pub use address_resolver::{AddressResolver, IpFamily};
pub use zone_provider::{
    Change, ChangeAction, ChangeBatch, ChangeReceipt, MANAGED_TTL, RecordSet, RecordType,
    ZoneProvider,
};
