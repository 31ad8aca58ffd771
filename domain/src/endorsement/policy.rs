//! Endorsement policy construction

use serde::{Deserialize, Serialize};

/// Membership role a policy member must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Member,
    Admin,
    Peer,
    Client,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "member",
            MemberRole::Admin => "admin",
            MemberRole::Peer => "peer",
            MemberRole::Client => "client",
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(MemberRole::Member),
            "admin" => Ok(MemberRole::Admin),
            "peer" => Ok(MemberRole::Peer),
            "client" => Ok(MemberRole::Client),
            _ => Err(format!(
                "Unknown member role: {}. Valid: member, admin, peer, client",
                s
            )),
        }
    }
}

/// A role bound to a resolved membership identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMember {
    pub role: MemberRole,
    pub membership_id: String,
}

/// Endorsement policy sent with an instantiate or upgrade proposal.
///
/// Built fresh for every call from static configuration and never mutated
/// afterwards; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementPolicy {
    members: Vec<PolicyMember>,
    expression: String,
}

impl EndorsementPolicy {
    pub fn new(members: Vec<PolicyMember>, expression: impl Into<String>) -> Self {
        Self {
            members,
            expression: expression.into(),
        }
    }

    pub fn members(&self) -> &[PolicyMember] {
        &self.members
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Principal strings in `MSPID.role` form, in member order.
    pub fn principals(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| format!("{}.{}", m.membership_id, m.role))
            .collect()
    }
}
