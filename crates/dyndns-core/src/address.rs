//! Address state and the diff between published and observed addresses

use serde::{Deserialize, Serialize};

use crate::traits::IpFamily;

/// One address per family; `None` means undetermined or unsupported
///
/// The engine keeps two of these: `published` (what DNS holds) and
/// `observed` (what the echo service reported this iteration).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPair {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl AddressPair {
    /// Build a pair from raw strings, treating blank strings as unknown
    pub fn from_parts(ipv4: &str, ipv6: &str) -> Self {
        let mut pair = Self::default();
        pair.set(IpFamily::V4, Some(ipv4.to_string()));
        pair.set(IpFamily::V6, Some(ipv6.to_string()));
        pair
    }

    /// Address for a family
    pub fn get(&self, family: IpFamily) -> Option<&str> {
        match family {
            IpFamily::V4 => self.ipv4.as_deref(),
            IpFamily::V6 => self.ipv6.as_deref(),
        }
    }

    /// Replace the address for a family; blank values become `None`
    pub fn set(&mut self, family: IpFamily, value: Option<String>) {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match family {
            IpFamily::V4 => self.ipv4 = value,
            IpFamily::V6 => self.ipv6 = value,
        }
    }

    /// True when neither family is known
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Advance to the values in a change set, leaving other families alone
    pub fn apply(&mut self, changes: &ChangeSet) {
        for (family, value) in changes.iter() {
            self.set(family, Some(value.to_string()));
        }
    }
}

impl std::fmt::Display for AddressPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ipv4={} ipv6={}",
            self.ipv4.as_deref().unwrap_or("<none>"),
            self.ipv6.as_deref().unwrap_or("<none>")
        )
    }
}

/// The values to write in one reconciliation
///
/// A family is present only when its observed value is known and differs
/// from the published one. An observed `None` never produces a change, so
/// a family that disappears leaves its record untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl ChangeSet {
    /// Compute the changes needed to move `published` to `observed`
    pub fn between(published: &AddressPair, observed: &AddressPair) -> Self {
        let changed = |family: IpFamily| match observed.get(family) {
            Some(value) if published.get(family) != Some(value) => Some(value.to_string()),
            _ => None,
        };

        Self {
            ipv4: changed(IpFamily::V4),
            ipv6: changed(IpFamily::V6),
        }
    }

    /// True when nothing needs to be written
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    /// Value to write for a family
    pub fn get(&self, family: IpFamily) -> Option<&str> {
        match family {
            IpFamily::V4 => self.ipv4.as_deref(),
            IpFamily::V6 => self.ipv6.as_deref(),
        }
    }

    /// Families with a value to write, IPv4 first
    pub fn iter(&self) -> impl Iterator<Item = (IpFamily, &str)> + '_ {
        IpFamily::ALL
            .into_iter()
            .filter_map(move |family| self.get(family).map(|value| (family, value)))
    }
}
