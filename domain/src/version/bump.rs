//! Version bumping

use super::number::VersionNumber;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Which component of a version to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionGranularity {
    Major,
    #[default]
    Minor,
    Revision,
}

impl VersionGranularity {
    /// Component index this granularity targets.
    pub fn index(&self) -> usize {
        match self {
            VersionGranularity::Major => 0,
            VersionGranularity::Minor => 1,
            VersionGranularity::Revision => 2,
        }
    }
}

impl std::fmt::Display for VersionGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionGranularity::Major => write!(f, "major"),
            VersionGranularity::Minor => write!(f, "minor"),
            VersionGranularity::Revision => write!(f, "revision"),
        }
    }
}

impl std::str::FromStr for VersionGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(VersionGranularity::Major),
            "minor" => Ok(VersionGranularity::Minor),
            "revision" | "patch" => Ok(VersionGranularity::Revision),
            _ => Err(format!(
                "Unknown version granularity: {}. Valid: major, minor, revision",
                s
            )),
        }
    }
}

impl VersionNumber {
    /// Advance the component at `granularity`.
    ///
    /// When the version is too short to have that component, the missing
    /// components are padded with `0` up to and including the target index
    /// and nothing is incremented. A component that cannot grow any further
    /// is an [`DomainError::InvalidVersion`].
    pub fn bump(&self, granularity: VersionGranularity) -> Result<VersionNumber, DomainError> {
        let index = granularity.index();
        let mut next = self.clone();
        let components = next.components_mut();

        if components.len() <= index {
            components.resize(index + 1, 0);
        } else {
            components[index] = components[index].checked_add(1).ok_or_else(|| {
                DomainError::InvalidVersion(format!(
                    "{} has no next {} version",
                    self, granularity
                ))
            })?;
            for c in components.iter_mut().skip(index + 1) {
                *c = 0;
            }
        }
        Ok(next)
    }
}

/// Bump a version string, preserving its marker.
///
/// # Example
///
/// ```
/// use endorse_domain::version::{VersionGranularity, bump_version};
///
/// assert_eq!(bump_version("1.2.3", VersionGranularity::Revision).unwrap(), "1.2.4");
/// assert_eq!(bump_version("v1.2", VersionGranularity::Major).unwrap(), "v2.0");
/// ```
pub fn bump_version(current: &str, granularity: VersionGranularity) -> Result<String, DomainError> {
    let version: VersionNumber = current.parse()?;
    Ok(version.bump(granularity)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_at_component_limit_is_an_error() {
        let current = format!("1.{}", u64::MAX);
        let err = bump_version(&current, VersionGranularity::Minor).unwrap_err();
        assert!(matches!(err, DomainError::InvalidVersion(_)));
        assert_eq!(
            bump_version(&current, VersionGranularity::Major).unwrap(),
            "2.0"
        );
    }

    #[test]
    fn test_bump_revision() {
        assert_eq!(
            bump_version("1.2.3", VersionGranularity::Revision).unwrap(),
            "1.2.4"
        );
    }

    #[test]
    fn test_bump_minor_resets_following() {
        assert_eq!(
            bump_version("1.2.3", VersionGranularity::Minor).unwrap(),
            "1.3.0"
        );
    }

    #[test]
    fn test_bump_major_resets_following() {
        assert_eq!(
            bump_version("1.2.3", VersionGranularity::Major).unwrap(),
            "2.0.0"
        );
    }

    #[test]
    fn test_bump_pads_short_version() {
        let padded = bump_version("1", VersionGranularity::Minor).unwrap();
        assert_eq!(padded, "1.0");
        assert_eq!(
            bump_version(&padded, VersionGranularity::Minor).unwrap(),
            "1.1"
        );
    }

    #[test]
    fn test_bump_pads_up_to_revision() {
        assert_eq!(
            bump_version("v3", VersionGranularity::Revision).unwrap(),
            "v3.0.0"
        );
    }

    #[test]
    fn test_bump_preserves_marker() {
        assert_eq!(
            bump_version("v1.2", VersionGranularity::Major).unwrap(),
            "v2.0"
        );
        assert_eq!(
            bump_version("v0.0.0", VersionGranularity::Major).unwrap(),
            "v1.0.0"
        );
    }

    #[test]
    fn test_bump_extra_components_reset() {
        assert_eq!(
            bump_version("1.2.3.4", VersionGranularity::Minor).unwrap(),
            "1.3.0.0"
        );
    }

    #[test]
    fn test_bump_malformed() {
        for bad in ["", "v", "1.a", "1..0", "x.1"] {
            let err = bump_version(bad, VersionGranularity::Minor).unwrap_err();
            assert_eq!(err, DomainError::InvalidVersion(bad.to_string()));
        }
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!(
            "MAJOR".parse::<VersionGranularity>().unwrap(),
            VersionGranularity::Major
        );
        assert_eq!(
            "patch".parse::<VersionGranularity>().unwrap(),
            VersionGranularity::Revision
        );
        assert!("huge".parse::<VersionGranularity>().is_err());
        assert_eq!(VersionGranularity::default(), VersionGranularity::Minor);
    }
}
