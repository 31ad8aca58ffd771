//! Deployment entities

use crate::core::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// Phases of a deployment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    ComputeVersion,
    InstallPerOrg,
    AllFailed,
    InstantiateOnce,
    Done,
}

impl DeploymentPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentPhase::ComputeVersion => "compute_version",
            DeploymentPhase::InstallPerOrg => "install",
            DeploymentPhase::AllFailed => "all_failed",
            DeploymentPhase::InstantiateOnce => "instantiate",
            DeploymentPhase::Done => "done",
        }
    }

    /// Phase that follows this one given how many organizations installed.
    pub fn next(&self, installed_orgs: usize) -> Option<DeploymentPhase> {
        match self {
            DeploymentPhase::ComputeVersion => Some(DeploymentPhase::InstallPerOrg),
            DeploymentPhase::InstallPerOrg if installed_orgs == 0 => {
                Some(DeploymentPhase::AllFailed)
            }
            DeploymentPhase::InstallPerOrg => Some(DeploymentPhase::InstantiateOnce),
            DeploymentPhase::InstantiateOnce => Some(DeploymentPhase::Done),
            DeploymentPhase::AllFailed | DeploymentPhase::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next(0).is_none()
    }
}

impl std::fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one organization's install ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Installed,
    Failed { kind: ErrorKind, error: String },
}

/// Install bookkeeping for a single organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentAttempt {
    pub organization: String,
    pub unit: String,
    pub version: String,
    pub outcome: AttemptOutcome,
    /// Install attempts consumed, including the final one
    pub attempts: usize,
}

impl DeploymentAttempt {
    pub fn installed(
        organization: impl Into<String>,
        unit: impl Into<String>,
        version: impl Into<String>,
        attempts: usize,
    ) -> Self {
        Self {
            organization: organization.into(),
            unit: unit.into(),
            version: version.into(),
            outcome: AttemptOutcome::Installed,
            attempts,
        }
    }

    pub fn failed(
        organization: impl Into<String>,
        unit: impl Into<String>,
        version: impl Into<String>,
        attempts: usize,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            unit: unit.into(),
            version: version.into(),
            outcome: AttemptOutcome::Failed {
                kind,
                error: error.into(),
            },
            attempts,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Installed)
    }

    pub fn failure(&self) -> Option<OrgFailure> {
        match &self.outcome {
            AttemptOutcome::Installed => None,
            AttemptOutcome::Failed { kind, error } => Some(OrgFailure {
                organization: self.organization.clone(),
                kind: *kind,
                error: error.clone(),
                attempts: self.attempts,
            }),
        }
    }
}

/// Per-organization failure detail surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgFailure {
    pub organization: String,
    pub kind: ErrorKind,
    pub error: String,
    pub attempts: usize,
}

/// What a finished deployment reports upward.
///
/// Only success/failure per organization survives; individual attempts are
/// discarded once orchestration completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub unit: String,
    pub channel: String,
    pub previous_version: String,
    pub version: String,
    pub upgrade: bool,
    pub installed: Vec<String>,
    pub failures: Vec<OrgFailure>,
    pub transaction_id: Option<String>,
}

impl DeploymentReport {
    /// Build the install part of a report from per-organization attempts.
    pub fn from_attempts(
        unit: impl Into<String>,
        channel: impl Into<String>,
        previous_version: impl Into<String>,
        version: impl Into<String>,
        upgrade: bool,
        attempts: &[DeploymentAttempt],
    ) -> Self {
        Self {
            unit: unit.into(),
            channel: channel.into(),
            previous_version: previous_version.into(),
            version: version.into(),
            upgrade,
            installed: attempts
                .iter()
                .filter(|a| a.is_installed())
                .map(|a| a.organization.clone())
                .collect(),
            failures: attempts.iter().filter_map(|a| a.failure()).collect(),
            transaction_id: None,
        }
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn summary(&self) -> String {
        let action = if self.upgrade { "Upgraded" } else { "Instantiated" };
        if self.failures.is_empty() {
            format!(
                "{} {} to {} on channel {}",
                action, self.unit, self.version, self.channel
            )
        } else {
            format!(
                "{} {} to {} on channel {} ({} of {} organizations failed to install)",
                action,
                self.unit,
                self.version,
                self.channel,
                self.failures.len(),
                self.failures.len() + self.installed.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert_eq!(
            DeploymentPhase::ComputeVersion.next(0),
            Some(DeploymentPhase::InstallPerOrg)
        );
        assert_eq!(
            DeploymentPhase::InstallPerOrg.next(0),
            Some(DeploymentPhase::AllFailed)
        );
        assert_eq!(
            DeploymentPhase::InstallPerOrg.next(2),
            Some(DeploymentPhase::InstantiateOnce)
        );
        assert_eq!(
            DeploymentPhase::InstantiateOnce.next(2),
            Some(DeploymentPhase::Done)
        );
        assert!(DeploymentPhase::AllFailed.is_terminal());
        assert!(DeploymentPhase::Done.is_terminal());
        assert!(!DeploymentPhase::InstallPerOrg.is_terminal());
    }

    #[test]
    fn test_report_from_attempts() {
        let attempts = vec![
            DeploymentAttempt::installed("org1", "kv", "v1.0.0", 1),
            DeploymentAttempt::failed(
                "org2",
                "kv",
                "v1.0.0",
                3,
                ErrorKind::Timeout,
                "install timed out",
            ),
            DeploymentAttempt::installed("org3", "kv", "v1.0.0", 2),
        ];
        let report =
            DeploymentReport::from_attempts("kv", "ch1", "v0.0.0", "v1.0.0", false, &attempts);

        assert_eq!(report.installed, vec!["org1", "org3"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].organization, "org2");
        assert_eq!(report.failures[0].attempts, 3);
        assert!(report.summary().contains("1 of 3 organizations failed"));
    }

    #[test]
    fn test_summary_without_failures() {
        let attempts = vec![DeploymentAttempt::installed("org1", "kv", "v1.3.0", 1)];
        let report =
            DeploymentReport::from_attempts("kv", "ch1", "v1.2.0", "v1.3.0", true, &attempts)
                .with_transaction_id("abc");
        assert_eq!(report.summary(), "Upgraded kv to v1.3.0 on channel ch1");
        assert_eq!(report.transaction_id.as_deref(), Some("abc"));
    }
}
