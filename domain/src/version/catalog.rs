//! Installed-unit metadata and the latest-version fold

use super::number::VersionNumber;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Version reported when a unit has never been installed.
pub const BASE_VERSION: &str = "v0.0.0";

/// A unit as reported by a peer's installed-unit query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledUnit {
    pub name: String,
    pub version: String,
}

impl InstalledUnit {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Whether `version` is the never-deployed baseline.
pub fn is_baseline(version: &str) -> bool {
    version == BASE_VERSION
}

/// Highest installed version of `unit`, or [`BASE_VERSION`] if none.
///
/// Entries for other units and entries with malformed versions are skipped.
/// The winning entry's version string is returned as reported, marker and all.
pub fn latest_installed(installed: &[InstalledUnit], unit: &str) -> String {
    let baseline: VersionNumber = match BASE_VERSION.parse() {
        Ok(v) => v,
        Err(_) => return BASE_VERSION.to_string(),
    };

    installed
        .iter()
        .filter(|entry| entry.name == unit)
        .filter_map(|entry| {
            entry
                .version
                .parse::<VersionNumber>()
                .ok()
                .map(|parsed| (entry.version.as_str(), parsed))
        })
        .fold(
            (BASE_VERSION, baseline),
            |(best_raw, best), (raw, parsed)| {
                if parsed.cmp_components(&best) == Ordering::Greater {
                    (raw, parsed)
                } else {
                    (best_raw, best)
                }
            },
        )
        .0
        .to_string()
}
