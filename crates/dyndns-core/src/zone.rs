//! Zone reader and writer for the managed domain
//!
//! [`Zone`] binds a [`ZoneProvider`] to one hosted zone and one record name.
//! It owns the client-side logic the provider API does not do for us:
//! matching the managed name in a full listing, picking the single value we
//! manage, and building the UPSERT batch.

use tracing::{debug, warn};

use crate::address::{AddressPair, ChangeSet};
use crate::config::ManagedDomain;
use crate::error::{Error, Result};
use crate::traits::{
    Change, ChangeAction, ChangeBatch, ChangeReceipt, MANAGED_TTL, RecordSet, RecordType,
    ZoneProvider,
};

/// Comment attached to every change batch
pub const CHANGE_COMMENT: &str = "Maintained by dyndns";

/// The managed record name inside one hosted zone
pub struct Zone {
    provider: Box<dyn ZoneProvider>,
    zone_id: String,
    domain: String,
}

impl Zone {
    /// Bind a provider to the managed domain
    pub fn new(provider: Box<dyn ZoneProvider>, domain: &ManagedDomain) -> Self {
        Self {
            provider,
            zone_id: domain.zone_id().to_string(),
            domain: domain.name.clone(),
        }
    }

    /// Hosted zone id (without the `/hostedzone/` prefix)
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Managed record name as configured
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Provider name (for logging)
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Read the A and AAAA values currently published for the domain
    ///
    /// Lists every record set in the zone and filters client-side. Record
    /// sets are expected to carry exactly one value:
    /// - no value at all (e.g. an alias record) is a [`Error::MalformedRecord`]
    /// - several values are tolerated; only the first is considered
    pub async fn read_existing(&self) -> Result<AddressPair> {
        let record_sets = self.provider.list_record_sets(&self.zone_id).await?;
        debug!(
            "Listed {} record set(s) in zone {}",
            record_sets.len(),
            self.zone_id
        );

        let mut existing = AddressPair::default();

        for set in record_sets
            .iter()
            .filter(|set| names_match(&set.name, &self.domain))
        {
            let Some(record_type) = RecordType::parse(&set.record_type) else {
                debug!("Ignoring {} record for {}", set.record_type, set.name);
                continue;
            };

            let value = single_value(set)?;
            existing.set(record_type.family(), Some(value.to_string()));
        }

        Ok(existing)
    }

    /// Upsert the changed records in one batch
    ///
    /// Every value must be non-empty, and at least one must be present;
    /// violations are rejected before any provider call.
    pub async fn upsert(&self, changes: &ChangeSet) -> Result<ChangeReceipt> {
        let batch = self.change_batch(changes)?;
        self.provider
            .change_record_sets(&self.zone_id, &batch)
            .await
    }

    /// Build the UPSERT batch for a change set
    pub fn change_batch(&self, changes: &ChangeSet) -> Result<ChangeBatch> {
        let mut batch = ChangeBatch {
            comment: CHANGE_COMMENT.to_string(),
            changes: Vec::new(),
        };

        for family in crate::traits::IpFamily::ALL {
            let Some(value) = changes.get(family) else {
                continue;
            };

            let value = value.trim();
            if value.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Refusing to upsert an empty {} value for {}",
                    family, self.domain
                )));
            }

            batch.changes.push(Change {
                action: ChangeAction::Upsert,
                name: self.domain.clone(),
                record_type: RecordType::for_family(family),
                ttl: MANAGED_TTL,
                value: value.to_string(),
            });
        }

        if batch.changes.is_empty() {
            return Err(Error::invalid_input(format!(
                "Refusing to submit an empty change batch for {}",
                self.domain
            )));
        }

        Ok(batch)
    }
}

/// Compare a listed record name with the managed domain
///
/// Trailing dots are optional on both sides, case is ignored, and Route 53
/// style octal escapes (`\052` for `*`) in the listed name are decoded.
pub fn names_match(listed: &str, domain: &str) -> bool {
    let listed = unescape_name(listed);
    let listed = listed.strip_suffix('.').unwrap_or(&listed);
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    listed.eq_ignore_ascii_case(domain)
}

/// Decode `\ooo` octal escapes used by hosted-zone listings
fn unescape_name(name: &str) -> String {
    if !name.contains('\\') {
        return name.to_string();
    }

    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            if let Some(c) = char::from_u32(code) {
                out.push(c);
                i += 4;
                continue;
            }
        }

        // Names are ASCII in practice; fall back to char-wise copy otherwise
        let c = name[i..].chars().next().unwrap_or('\u{fffd}');
        out.push(c);
        i += c.len_utf8();
    }

    out
}

fn single_value(set: &RecordSet) -> Result<&str> {
    match set.values.as_slice() {
        [] => Err(Error::malformed_record(format!(
            "{} record for {} has no resource records (alias records are not managed)",
            set.record_type, set.name
        ))),
        [only] => Ok(only.as_str()),
        [first, ..] => {
            warn!(
                "{} record for {} has {} values; only the first ({}) is managed",
                set.record_type,
                set.name,
                set.values.len(),
                first
            );
            Ok(first.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FixedProvider {
        record_sets: Vec<RecordSet>,
        submitted: Arc<Mutex<Vec<ChangeBatch>>>,
    }

    impl FixedProvider {
        fn new(record_sets: Vec<RecordSet>) -> Self {
            Self {
                record_sets,
                submitted: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ZoneProvider for FixedProvider {
        async fn list_record_sets(&self, _zone_id: &str) -> Result<Vec<RecordSet>> {
            Ok(self.record_sets.clone())
        }

        async fn change_record_sets(
            &self,
            _zone_id: &str,
            batch: &ChangeBatch,
        ) -> Result<ChangeReceipt> {
            self.submitted.lock().unwrap().push(batch.clone());
            Ok(ChangeReceipt {
                id: "/change/C1".to_string(),
                status: "PENDING".to_string(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn record(name: &str, record_type: &str, values: &[&str]) -> RecordSet {
        RecordSet {
            name: name.to_string(),
            record_type: record_type.to_string(),
            ttl: Some(300),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn zone(domain: &str, record_sets: Vec<RecordSet>) -> Zone {
        Zone::new(
            Box::new(FixedProvider::new(record_sets)),
            &ManagedDomain::new(domain, "/hostedzone/Z1"),
        )
    }

    #[test]
    fn trailing_dot_is_optional() {
        assert!(names_match("example.com.", "example.com"));
        assert!(names_match("example.com", "example.com."));
        assert!(names_match("example.com.", "example.com."));
        assert!(names_match("Home.Example.com.", "home.example.com"));
        assert!(!names_match("www.example.com.", "example.com"));
        assert!(!names_match("example.com.", "www.example.com"));
    }

    #[test]
    fn octal_escapes_are_decoded() {
        assert!(names_match("\\052.example.com.", "*.example.com"));
        assert_eq!(unescape_name("plain.example.com."), "plain.example.com.");
        assert_eq!(unescape_name("trailing\\05"), "trailing\\05");
    }

    #[tokio::test]
    async fn reads_both_families_for_matching_name() {
        let zone = zone(
            "home.example.com",
            vec![
                record("example.com.", "A", &["9.9.9.9"]),
                record("home.example.com.", "A", &["1.1.1.1"]),
                record("home.example.com.", "AAAA", &["2001:db8::1"]),
                record("home.example.com.", "TXT", &["\"hello\""]),
            ],
        );

        let existing = zone.read_existing().await.unwrap();
        assert_eq!(existing, AddressPair::from_parts("1.1.1.1", "2001:db8::1"));
        assert_eq!(zone.zone_id(), "Z1");
    }

    #[tokio::test]
    async fn missing_records_read_as_unknown() {
        let zone = zone(
            "home.example.com",
            vec![record("other.example.com.", "A", &["1.1.1.1"])],
        );

        let existing = zone.read_existing().await.unwrap();
        assert!(existing.is_empty());
    }

    #[tokio::test]
    async fn record_without_values_is_a_shape_error() {
        let zone = zone(
            "home.example.com",
            vec![record("home.example.com.", "A", &[])],
        );

        let err = zone.read_existing().await.unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn multi_value_record_uses_first_value() {
        let zone = zone(
            "home.example.com",
            vec![record("home.example.com.", "A", &["1.1.1.1", "2.2.2.2"])],
        );

        let existing = zone.read_existing().await.unwrap();
        assert_eq!(existing.ipv4.as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn batch_contains_one_upsert_per_family() {
        let zone = zone("home.example.com", Vec::new());
        let batch = zone
            .change_batch(&ChangeSet {
                ipv4: Some("1.2.3.4".to_string()),
                ipv6: Some("2001:db8::1".to_string()),
            })
            .unwrap();

        assert_eq!(batch.comment, CHANGE_COMMENT);
        assert_eq!(batch.changes.len(), 2);
        assert_eq!(batch.changes[0].record_type, RecordType::A);
        assert_eq!(batch.changes[1].record_type, RecordType::Aaaa);
        for change in &batch.changes {
            assert_eq!(change.action, ChangeAction::Upsert);
            assert_eq!(change.ttl, 300);
            assert_eq!(change.name, "home.example.com");
        }
    }

    #[test]
    fn empty_values_are_rejected() {
        let zone = zone("home.example.com", Vec::new());

        let err = zone
            .change_batch(&ChangeSet {
                ipv4: Some("  ".to_string()),
                ipv6: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = zone.change_batch(&ChangeSet::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn upsert_submits_single_batch() {
        let provider = FixedProvider::new(Vec::new());
        let submitted = Arc::clone(&provider.submitted);
        let zone = Zone::new(
            Box::new(provider),
            &ManagedDomain::new("home.example.com", "Z1"),
        );

        let receipt = zone
            .upsert(&ChangeSet {
                ipv4: None,
                ipv6: Some("2001:db8::1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(receipt.status, "PENDING");
        let submitted = submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].changes.len(), 1);
        assert_eq!(submitted[0].changes[0].record_type, RecordType::Aaaa);
    }
}
