//! Network configuration from TOML (`[network]` and `[credentials]` sections)
//!
//! Example configuration:
//!
//! ```toml
//! [network]
//! primary_organization = "org1"
//! query_scope = "whole_organization"   # or "single_peer"
//!
//! [network.organizations.org1]
//! msp_id = "Org1MSP"
//! peers = [
//!     { name = "peer0.org1", url = "grpcs://localhost:7051" },
//!     { name = "peer1.org1", url = "grpcs://localhost:8051" },
//! ]
//!
//! [credentials]
//! signed_cert = "crypto/%org%/admin/cert.pem"
//! admin_private_key = "crypto/%org%/admin/key.pem"
//! ```

use endorse_domain::TargetScope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder replaced by the organization name in credential templates.
pub const ORG_PLACEHOLDER: &str = "%org%";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePeerConfig {
    pub name: String,
    pub url: String,
}

/// One `[network.organizations.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrganizationConfig {
    /// Membership identifier; defaults to `<Name>MSP`
    pub msp_id: Option<String>,
    pub peers: Vec<FilePeerConfig>,
    /// Explicit admin certificate path, overrides the credentials template
    pub signed_cert: Option<String>,
    /// Explicit admin key path, overrides the credentials template
    pub admin_private_key: Option<String>,
}

impl FileOrganizationConfig {
    pub fn msp_id(&self, name: &str) -> String {
        self.msp_id.clone().unwrap_or_else(|| {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => format!("{}{}MSP", first.to_uppercase(), chars.as_str()),
                None => "MSP".to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNetworkConfig {
    /// Organization that computes versions and instantiates; may be omitted
    /// when exactly one organization is configured
    pub primary_organization: Option<String>,
    /// Which peers of an organization answer read-only calls
    pub query_scope: TargetScope,
    pub organizations: BTreeMap<String, FileOrganizationConfig>,
}

impl FileNetworkConfig {
    /// Primary organization, inferred when only one organization exists.
    pub fn primary(&self) -> Option<&str> {
        match &self.primary_organization {
            Some(name) => Some(name.as_str()),
            None if self.organizations.len() == 1 => {
                self.organizations.keys().next().map(String::as_str)
            }
            None => None,
        }
    }
}

/// Simulated network options (`[simulation]` section)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSimulationConfig {
    /// JSON snapshot that keeps the simulated ledger between runs
    pub state_file: Option<String>,
}

/// Credential path templates shared by every organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCredentialsConfig {
    pub signed_cert: Option<String>,
    pub admin_private_key: Option<String>,
}

impl FileCredentialsConfig {
    /// Substitute `%org%` in a template.
    pub fn expand(template: &str, organization: &str) -> String {
        template.replace(ORG_PLACEHOLDER, organization)
    }
}
