//! Test doubles and common utilities for engine contract tests
//!
//! The doubles script their answers up front and count every call, so a
//! test can assert exactly how often the network would have been touched.

#![allow(dead_code)]

use dyndns_core::config::{DdnsConfig, EngineConfig, ManagedDomain, ProviderConfig};
use dyndns_core::error::{Error, Result};
use dyndns_core::traits::{
    AddressResolver, ChangeBatch, ChangeReceipt, IpFamily, RecordSet, ZoneProvider,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted answer from the echo service
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The service answered with this body
    Found(&'static str),
    /// Family unsupported or service unreachable
    Missing,
    /// Structural failure (timeout)
    Fails,
}

/// An AddressResolver that replays a script per family
///
/// The last entry of each script repeats forever; an empty script answers
/// `Ok(None)`.
pub struct ScriptedResolver {
    ipv4: Mutex<VecDeque<Lookup>>,
    ipv6: Mutex<VecDeque<Lookup>>,
    /// Call counter for resolve()
    resolve_call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new(ipv4: Vec<Lookup>, ipv6: Vec<Lookup>) -> Self {
        Self {
            ipv4: Mutex::new(ipv4.into()),
            ipv6: Mutex::new(ipv6.into()),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with the same pair
    pub fn fixed(ipv4: Lookup, ipv6: Lookup) -> Self {
        Self::new(vec![ipv4], vec![ipv6])
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Shared handle to the call counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resolve_call_count)
    }
}

#[async_trait::async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self, family: IpFamily) -> Result<Option<String>> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);

        let script = match family {
            IpFamily::V4 => &self.ipv4,
            IpFamily::V6 => &self.ipv6,
        };

        let next = {
            let mut script = script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match next {
            Some(Lookup::Found(body)) => Ok(Some(body.to_string())),
            Some(Lookup::Missing) | None => Ok(None),
            Some(Lookup::Fails) => Err(Error::network(format!("{} lookup timed out", family))),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock ZoneProvider that serves a fixed listing and records batches
pub struct MockZoneProvider {
    /// Record sets returned by list_record_sets()
    record_sets: Arc<Mutex<Vec<RecordSet>>>,
    /// Errors returned (in order) before list_record_sets() succeeds
    list_failures: Arc<Mutex<VecDeque<Error>>>,
    /// Errors returned (in order) before change_record_sets() succeeds
    change_failures: Arc<Mutex<VecDeque<Error>>>,
    /// Call counter for list_record_sets()
    list_call_count: Arc<AtomicUsize>,
    /// Call counter for change_record_sets()
    change_call_count: Arc<AtomicUsize>,
    /// Batches accepted by change_record_sets()
    accepted_batches: Arc<Mutex<Vec<ChangeBatch>>>,
}

impl MockZoneProvider {
    pub fn new(record_sets: Vec<RecordSet>) -> Self {
        Self {
            record_sets: Arc::new(Mutex::new(record_sets)),
            list_failures: Arc::new(Mutex::new(VecDeque::new())),
            change_failures: Arc::new(Mutex::new(VecDeque::new())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            change_call_count: Arc::new(AtomicUsize::new(0)),
            accepted_batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An empty hosted zone
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Fail the next list calls with these errors
    pub fn fail_lists_with(self, errors: Vec<Error>) -> Self {
        self.list_failures.lock().unwrap().extend(errors);
        self
    }

    /// Fail the next change calls with these errors
    pub fn fail_changes_with(&self, errors: Vec<Error>) {
        self.change_failures.lock().unwrap().extend(errors);
    }

    /// Get the number of times list_record_sets() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times change_record_sets() was called
    pub fn change_call_count(&self) -> usize {
        self.change_call_count.load(Ordering::SeqCst)
    }

    /// Batches the provider accepted
    pub fn accepted_batches(&self) -> Vec<ChangeBatch> {
        self.accepted_batches.lock().unwrap().clone()
    }

    /// Create a new MockZoneProvider that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            record_sets: Arc::clone(&other.record_sets),
            list_failures: Arc::clone(&other.list_failures),
            change_failures: Arc::clone(&other.change_failures),
            list_call_count: Arc::clone(&other.list_call_count),
            change_call_count: Arc::clone(&other.change_call_count),
            accepted_batches: Arc::clone(&other.accepted_batches),
        }
    }
}

#[async_trait::async_trait]
impl ZoneProvider for MockZoneProvider {
    async fn list_record_sets(&self, _zone_id: &str) -> Result<Vec<RecordSet>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.list_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        Ok(self.record_sets.lock().unwrap().clone())
    }

    async fn change_record_sets(&self, _zone_id: &str, batch: &ChangeBatch) -> Result<ChangeReceipt> {
        let call = self.change_call_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(error) = self.change_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        self.accepted_batches.lock().unwrap().push(batch.clone());

        Ok(ChangeReceipt {
            id: format!("/change/C{}", call),
            status: "PENDING".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A record set with a single value
pub fn record(name: &str, record_type: &str, value: &str) -> RecordSet {
    RecordSet {
        name: name.to_string(),
        record_type: record_type.to_string(),
        ttl: Some(300),
        values: vec![value.to_string()],
    }
}

/// Helper to create a minimal DdnsConfig for testing
///
/// 60 second interval without jitter, two immediate retries.
pub fn minimal_config(domain: &str) -> DdnsConfig {
    let mut config = DdnsConfig::new(
        ManagedDomain::new(domain, "/hostedzone/ZTEST")
            .with_poll_interval_secs(60)
            .with_jitter_secs(0),
        ProviderConfig::new("AKIDEXAMPLE", "secret"),
    );
    config.engine = EngineConfig {
        max_retries: 2,
        retry_delay_secs: 0,
        max_retry_delay_secs: 0,
        event_channel_capacity: 100,
    };
    config
}
