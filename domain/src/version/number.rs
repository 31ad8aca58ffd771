//! Numeric version parsing and comparison

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A parsed version: optional marker plus numeric components.
///
/// # Example
///
/// ```
/// use endorse_domain::version::VersionNumber;
///
/// let v: VersionNumber = "v1.2".parse().unwrap();
/// assert_eq!(v.marker(), Some('v'));
/// assert_eq!(v.components(), &[1, 2]);
/// assert_eq!(v.to_string(), "v1.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionNumber {
    marker: Option<char>,
    components: Vec<u64>,
}

impl VersionNumber {
    pub fn new(marker: Option<char>, components: Vec<u64>) -> Self {
        Self { marker, components }
    }

    pub fn marker(&self) -> Option<char> {
        self.marker
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut Vec<u64> {
        &mut self.components
    }

    /// Compare numeric components only; markers are ignored.
    pub fn cmp_components(&self, other: &Self) -> Ordering {
        compare_components(&self.components, &other.components)
    }
}

impl std::fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(marker) = self.marker {
            write!(f, "{}", marker)?;
        }
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl std::str::FromStr for VersionNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (marker, rest) = split_marker(s);
        let components = parse_components(rest)
            .ok_or_else(|| DomainError::InvalidVersion(s.to_string()))?;
        Ok(Self { marker, components })
    }
}

/// Split off a single leading non-digit marker character, if present.
pub(crate) fn split_marker(s: &str) -> (Option<char>, &str) {
    match s.chars().next() {
        Some(c) if !c.is_ascii_digit() => (Some(c), &s[c.len_utf8()..]),
        _ => (None, s),
    }
}

/// Parse dot-separated non-negative integer components.
///
/// Returns `None` for an empty string or any component that is not a
/// plain run of ASCII digits.
fn parse_components(s: &str) -> Option<Vec<u64>> {
    if s.is_empty() {
        return None;
    }
    s.split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect()
}

fn compare_components(a: &[u64], b: &[u64]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    // Equal common prefix: the shorter sequence is smaller
    a.len().cmp(&b.len())
}

/// Compare two bare version strings component-wise as integers.
///
/// Neither string may carry a marker. A strict prefix is smaller, so
/// `"1.2"` sorts before `"1.2.0"`.
///
/// # Example
///
/// ```
/// use endorse_domain::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.7.1", "1.6.10").unwrap(), Ordering::Greater);
/// assert_eq!(compare_versions("1.7.1", "1.7.10").unwrap(), Ordering::Less);
/// assert_eq!(compare_versions("1.2", "1.2.0").unwrap(), Ordering::Less);
/// assert!(compare_versions("1.x", "1.0").is_err());
/// ```
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, DomainError> {
    let left = parse_components(a).ok_or_else(|| DomainError::InvalidVersion(a.to_string()))?;
    let right = parse_components(b).ok_or_else(|| DomainError::InvalidVersion(b.to_string()))?;
    Ok(compare_components(&left, &right))
}
