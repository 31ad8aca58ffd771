//! Network configuration container.
//!
//! [`NetworkConfig`] is the validated, static view of the ledger network the
//! use cases work against. It is built once at startup (usually from the
//! infrastructure file config) and shared read-only.

use endorse_domain::{DomainError, MemberRole, TargetScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A peer operated by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub url: String,
}

/// One organization of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub name: String,
    pub msp_id: String,
    pub peers: Vec<PeerConfig>,
    /// Admin certificate used to sign on behalf of the organization.
    pub signed_cert: Option<PathBuf>,
    /// Admin private key matching `signed_cert`.
    pub admin_private_key: Option<PathBuf>,
}

/// Where the source of a deployable unit lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    pub code_location: String,
    pub language: String,
}

/// A (role, organization) pair before membership resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementMemberConfig {
    pub role: MemberRole,
    pub organization: String,
}

/// Static endorsement policy inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EndorsementConfig {
    pub members: Vec<EndorsementMemberConfig>,
    pub expression: String,
}

/// Static description of the ledger network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    primary_organization: String,
    organizations: BTreeMap<String, OrganizationConfig>,
    units: BTreeMap<String, UnitConfig>,
    endorsement: EndorsementConfig,
    query_scope: TargetScope,
}

impl NetworkConfig {
    /// Create a config, rejecting an unknown primary organization or an
    /// endorsement member that names an unknown organization.
    pub fn new(
        primary_organization: impl Into<String>,
        organizations: Vec<OrganizationConfig>,
        units: Vec<UnitConfig>,
        endorsement: EndorsementConfig,
        query_scope: TargetScope,
    ) -> Result<Self, DomainError> {
        let primary_organization = primary_organization.into();
        let organizations: BTreeMap<String, OrganizationConfig> = organizations
            .into_iter()
            .map(|o| (o.name.clone(), o))
            .collect();

        if organizations.is_empty() {
            return Err(DomainError::Configuration(
                "no organizations configured".to_string(),
            ));
        }
        if !organizations.contains_key(&primary_organization) {
            return Err(DomainError::Configuration(format!(
                "primary organization '{}' is not configured",
                primary_organization
            )));
        }
        if let Some(member) = endorsement
            .members
            .iter()
            .find(|m| !organizations.contains_key(&m.organization))
        {
            return Err(DomainError::Configuration(format!(
                "endorsement member references unknown organization '{}'",
                member.organization
            )));
        }

        Ok(Self {
            primary_organization,
            organizations,
            units: units.into_iter().map(|u| (u.name.clone(), u)).collect(),
            endorsement,
            query_scope,
        })
    }

    // ==================== Accessors ====================

    pub fn primary_organization(&self) -> &str {
        &self.primary_organization
    }

    pub fn organization(&self, name: &str) -> Result<&OrganizationConfig, DomainError> {
        self.organizations
            .get(name)
            .ok_or_else(|| DomainError::Configuration(format!("Organization {} not found", name)))
    }

    pub fn organizations(&self) -> impl Iterator<Item = &OrganizationConfig> {
        self.organizations.values()
    }

    pub fn organization_names(&self) -> Vec<String> {
        self.organizations.keys().cloned().collect()
    }

    /// Membership identifier configured for an organization.
    pub fn msp_for_org(&self, name: &str) -> Result<&str, DomainError> {
        self.organization(name).map(|o| o.msp_id.as_str())
    }

    pub fn unit(&self, name: &str) -> Result<&UnitConfig, DomainError> {
        self.units.get(name).ok_or_else(|| {
            DomainError::Configuration(format!("Unit {} has no configured code location", name))
        })
    }

    pub fn endorsement(&self) -> &EndorsementConfig {
        &self.endorsement
    }

    pub fn query_scope(&self) -> TargetScope {
        self.query_scope
    }

    /// Organization a call runs as: the requested one, or the primary.
    pub fn resolve_organization(&self, requested: Option<&str>) -> Result<&str, DomainError> {
        match requested {
            Some(name) => self.organization(name).map(|o| o.name.as_str()),
            None => Ok(self.primary_organization()),
        }
    }
}
