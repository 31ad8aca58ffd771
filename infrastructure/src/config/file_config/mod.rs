//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod endorsement;
mod execution;
mod network;
mod output;

pub use endorsement::{FileEndorsementConfig, FileEndorsementMember};
pub use execution::{FileDeployConfig, FileTimeoutsConfig};
pub use network::{
    FileCredentialsConfig, FileNetworkConfig, FileOrganizationConfig, FilePeerConfig,
    FileSimulationConfig, ORG_PLACEHOLDER,
};
pub use output::{FileAuditConfig, FileOutputConfig};

use endorse_application::config::{
    ExecutionParams, NetworkConfig, OrganizationConfig, PeerConfig, UnitConfig,
};
use endorse_domain::{DomainError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration problems detected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("no organizations configured under [network.organizations]")]
    NoOrganizations,

    #[error("network.primary_organization must be set when several organizations are configured")]
    MissingPrimaryOrganization,

    #[error("primary organization '{0}' is not configured")]
    UnknownPrimaryOrganization(String),

    #[error("endorsement member references unknown organization '{0}'")]
    UnknownEndorsementMember(String),

    #[error("{0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("deploy.max_install_attempts cannot be 0")]
    ZeroInstallAttempts,

    #[error("contract '{0}' has an empty code_location")]
    EmptyCodeLocation(String),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl ConfigValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// One `[contracts.<unit>]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContractConfig {
    pub code_location: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "golang".to_string()
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub network: FileNetworkConfig,
    pub credentials: FileCredentialsConfig,
    pub endorsement: FileEndorsementConfig,
    pub contracts: BTreeMap<String, FileContractConfig>,
    pub timeouts: FileTimeoutsConfig,
    pub deploy: FileDeployConfig,
    pub output: FileOutputConfig,
    pub audit: FileAuditConfig,
    pub simulation: FileSimulationConfig,
    /// Directory relative paths resolve against; set by the loader
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validate the entire configuration, returning every detected issue.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        let organizations = &self.network.organizations;

        if organizations.is_empty() {
            issues.push(ConfigValidationError::NoOrganizations);
        } else {
            match self.network.primary() {
                None => issues.push(ConfigValidationError::MissingPrimaryOrganization),
                Some(primary) if !organizations.contains_key(primary) => issues.push(
                    ConfigValidationError::UnknownPrimaryOrganization(primary.to_string()),
                ),
                Some(_) => {}
            }
        }

        for member in &self.endorsement.members {
            if !organizations.contains_key(&member.organization) {
                issues.push(ConfigValidationError::UnknownEndorsementMember(
                    member.organization.clone(),
                ));
            }
        }

        for (field, value) in [
            ("timeouts.install_seconds", self.timeouts.install_seconds),
            ("timeouts.proposal_seconds", self.timeouts.proposal_seconds),
            ("timeouts.commit_seconds", self.timeouts.commit_seconds),
        ] {
            if value == 0 {
                issues.push(ConfigValidationError::ZeroTimeout(field));
            }
        }

        if self.deploy.max_install_attempts == 0 {
            issues.push(ConfigValidationError::ZeroInstallAttempts);
        }

        for (name, contract) in &self.contracts {
            if contract.code_location.trim().is_empty() {
                issues.push(ConfigValidationError::EmptyCodeLocation(name.clone()));
            }
        }

        issues
    }

    /// Resolve `path` against the config file's directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Certificate and key paths for `organization`: explicit paths first,
    /// then the `[credentials]` templates.
    pub fn credential_paths(&self, organization: &str) -> (Option<PathBuf>, Option<PathBuf>) {
        let org = self.network.organizations.get(organization);
        let pick = |explicit: Option<&String>, template: Option<&String>| {
            explicit
                .cloned()
                .or_else(|| template.map(|t| FileCredentialsConfig::expand(t, organization)))
                .map(|p| self.resolve_path(&p))
        };
        (
            pick(
                org.and_then(|o| o.signed_cert.as_ref()),
                self.credentials.signed_cert.as_ref(),
            ),
            pick(
                org.and_then(|o| o.admin_private_key.as_ref()),
                self.credentials.admin_private_key.as_ref(),
            ),
        )
    }

    /// Build the validated network view used by the application layer.
    pub fn to_network_config(&self) -> Result<NetworkConfig, ConfigValidationError> {
        if let Some(issue) = self.validate().into_iter().next() {
            return Err(issue);
        }
        let primary = self
            .network
            .primary()
            .ok_or(ConfigValidationError::MissingPrimaryOrganization)?;

        let organizations: Vec<OrganizationConfig> = self
            .network
            .organizations
            .iter()
            .map(|(name, org)| {
                let (signed_cert, admin_private_key) = self.credential_paths(name);
                OrganizationConfig {
                    name: name.clone(),
                    msp_id: org.msp_id(name),
                    peers: org
                        .peers
                        .iter()
                        .map(|p| PeerConfig {
                            name: p.name.clone(),
                            url: p.url.clone(),
                        })
                        .collect(),
                    signed_cert,
                    admin_private_key,
                }
            })
            .collect();

        let units: Vec<UnitConfig> = self
            .contracts
            .iter()
            .map(|(name, contract)| UnitConfig {
                name: name.clone(),
                code_location: self
                    .resolve_path(&contract.code_location)
                    .to_string_lossy()
                    .into_owned(),
                language: contract.language.clone(),
            })
            .collect();

        let names: Vec<String> = self.network.organizations.keys().cloned().collect();
        let endorsement = self.endorsement.to_endorsement_config(&names);

        Ok(NetworkConfig::new(
            primary,
            organizations,
            units,
            endorsement,
            self.network.query_scope,
        )?)
    }

    /// Timeouts and retry policy for the use cases.
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_install_timeout(Duration::from_secs(self.timeouts.install_seconds))
            .with_proposal_timeout(Duration::from_secs(self.timeouts.proposal_seconds))
            .with_commit_timeout(Duration::from_secs(self.timeouts.commit_seconds))
            .with_max_install_attempts(self.deploy.max_install_attempts)
            .with_install_retry_backoff(Duration::from_millis(self.deploy.retry_backoff_ms))
            .with_default_granularity(self.deploy.default_granularity)
    }

    /// Audit trail location, if auditing is enabled.
    pub fn audit_path(&self) -> Option<PathBuf> {
        self.audit.path.as_deref().map(|p| self.resolve_path(p))
    }

    /// Snapshot file for the simulated network, if persistence is enabled.
    pub fn simulation_state_path(&self) -> Option<PathBuf> {
        self.simulation
            .state_file
            .as_deref()
            .map(|p| self.resolve_path(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endorse_domain::{MemberRole, TargetScope, VersionGranularity};

    const FULL: &str = r#"
[network]
primary_organization = "org1"
query_scope = "whole_organization"

[network.organizations.org1]
msp_id = "Org1MSP"
peers = [
    { name = "peer0.org1", url = "grpcs://localhost:7051" },
    { name = "peer1.org1", url = "grpcs://localhost:8051" },
]

[network.organizations.org2]
peers = [{ name = "peer0.org2", url = "grpcs://localhost:9051" }]
signed_cert = "/etc/endorse/org2-cert.pem"

[credentials]
signed_cert = "crypto/%org%/cert.pem"
admin_private_key = "crypto/%org%/key.pem"

[endorsement]
expression = "2-of"
members = [
    { role = "member", organization = "org1" },
    { role = "peer", organization = "org2" },
]

[contracts.kv]
code_location = "units/kv"

[timeouts]
install_seconds = 600

[deploy]
max_install_attempts = 5
retry_backoff_ms = 0
default_granularity = "revision"

[simulation]
state_file = ".endorse/ledger.json"
"#;

    fn full() -> FileConfig {
        let mut config: FileConfig = toml::from_str(FULL).unwrap();
        config.base_dir = Some(PathBuf::from("/srv/net"));
        config
    }

    #[test]
    fn test_deserialize_full_config() {
        let config = full();
        assert_eq!(config.network.primary(), Some("org1"));
        assert_eq!(config.network.organizations["org1"].peers.len(), 2);
        assert_eq!(config.endorsement.members[1].role, MemberRole::Peer);
        assert_eq!(config.contracts["kv"].language, "golang");
        assert_eq!(config.timeouts.install_seconds, 600);
        assert_eq!(config.timeouts.proposal_seconds, 30);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_config_has_no_network() {
        let config = FileConfig::default();
        assert_eq!(
            config.validate(),
            vec![ConfigValidationError::NoOrganizations]
        );
        assert_eq!(config.timeouts.install_seconds, 300);
        assert_eq!(config.deploy.max_install_attempts, 3);
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let mut config = full();
        config.network.primary_organization = Some("org9".to_string());
        config.timeouts.proposal_seconds = 0;
        config.deploy.max_install_attempts = 0;
        config.endorsement.members.push(FileEndorsementMember {
            role: MemberRole::Admin,
            organization: "org7".to_string(),
        });

        let issues = config.validate();
        assert_eq!(
            issues,
            vec![
                ConfigValidationError::UnknownPrimaryOrganization("org9".to_string()),
                ConfigValidationError::UnknownEndorsementMember("org7".to_string()),
                ConfigValidationError::ZeroTimeout("timeouts.proposal_seconds"),
                ConfigValidationError::ZeroInstallAttempts,
            ]
        );
        assert!(issues.iter().all(|i| i.kind() == ErrorKind::Configuration));
    }

    #[test]
    fn test_missing_primary_with_several_orgs() {
        let mut config = full();
        config.network.primary_organization = None;
        assert!(
            config
                .validate()
                .contains(&ConfigValidationError::MissingPrimaryOrganization)
        );
    }

    #[test]
    fn test_credential_paths_prefer_explicit_then_template() {
        let config = full();
        let (cert, key) = config.credential_paths("org1");
        assert_eq!(cert.unwrap(), PathBuf::from("/srv/net/crypto/org1/cert.pem"));
        assert_eq!(key.unwrap(), PathBuf::from("/srv/net/crypto/org1/key.pem"));

        let (cert, key) = config.credential_paths("org2");
        assert_eq!(cert.unwrap(), PathBuf::from("/etc/endorse/org2-cert.pem"));
        assert_eq!(key.unwrap(), PathBuf::from("/srv/net/crypto/org2/key.pem"));
    }

    #[test]
    fn test_to_network_config() {
        let network = full().to_network_config().unwrap();
        assert_eq!(network.primary_organization(), "org1");
        assert_eq!(network.msp_for_org("org2").unwrap(), "Org2MSP");
        assert_eq!(network.unit("kv").unwrap().code_location, "/srv/net/units/kv");
        assert_eq!(network.query_scope(), TargetScope::WholeOrganization);
        assert_eq!(network.endorsement().expression, "2-of");
    }

    #[test]
    fn test_to_network_config_rejects_invalid() {
        let err = FileConfig::default().to_network_config().unwrap_err();
        assert_eq!(err, ConfigValidationError::NoOrganizations);
    }

    #[test]
    fn test_to_execution_params() {
        let params = full().to_execution_params();
        assert_eq!(params.install_timeout, Duration::from_secs(600));
        assert_eq!(params.proposal_timeout, Duration::from_secs(30));
        assert_eq!(params.max_install_attempts, 5);
        assert_eq!(params.install_retry_backoff, Duration::ZERO);
        assert_eq!(params.default_granularity, VersionGranularity::Revision);
    }

    #[test]
    fn test_simulation_state_path_is_resolved() {
        assert_eq!(
            full().simulation_state_path(),
            Some(PathBuf::from("/srv/net/.endorse/ledger.json"))
        );
        assert_eq!(FileConfig::default().simulation_state_path(), None);
    }
}
