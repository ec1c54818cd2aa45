//! Mail addresses and the address book that normalizes raw recipient records.

use std::collections::HashSet;

/// A normalized mail address.
///
/// Either half may be missing: MSG recipients sometimes carry only a display
/// name, and bare `To: user@example.com` headers carry no name at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MailAddress {
    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The bare address (`user@domain`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl MailAddress {
    /// Build an address, treating empty strings as absent.
    pub fn new(name: Option<&str>, address: Option<&str>) -> Self {
        Self {
            name: non_empty(name),
            address: non_empty(address),
        }
    }

    /// `true` when neither a name nor an address is present.
    pub fn is_blank(&self) -> bool {
        self.name.is_none() && self.address.is_none()
    }

    /// Format for display: `"Name <address>"`, or whichever half exists.
    pub fn display(&self) -> String {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (Some(name), None) => name.clone(),
            (None, Some(address)) => address.clone(),
            (None, None) => String::new(),
        }
    }
}

impl std::fmt::Display for MailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// An address record as handed over by a source adapter.
///
/// A single record may be a group (`Team: a@x.com, b@x.com;`) that expands
/// into several final addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAddress {
    /// One mailbox.
    Single(MailAddress),
    /// A named group of mailboxes. The group name itself is not an address.
    Group {
        name: Option<String>,
        members: Vec<MailAddress>,
    },
}

/// Normalizes raw address records into a flat, duplicate-free list.
pub struct AddressBook;

impl AddressBook {
    /// Flatten groups, drop blank records and duplicates, keep first-seen order.
    pub fn normalize<I>(records: I) -> Vec<MailAddress>
    where
        I: IntoIterator<Item = RawAddress>,
    {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let flat = records.into_iter().flat_map(|record| match record {
            RawAddress::Single(address) => vec![address],
            RawAddress::Group { members, .. } => members,
        });

        for address in flat {
            if address.is_blank() {
                continue;
            }
            if seen.insert((address.name.clone(), address.address.clone())) {
                result.push(address);
            }
        }

        result
    }
}
