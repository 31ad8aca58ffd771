//! Endorsement policy configuration from TOML (`[endorsement]` section)
//!
//! ```toml
//! [endorsement]
//! expression = "2-of"
//! members = [
//!     { role = "member", organization = "org1" },
//!     { role = "peer", organization = "org2" },
//! ]
//! ```
//!
//! When no members are listed, every configured organization endorses as
//! `member` with a `1-of` expression.

use endorse_application::config::{EndorsementConfig, EndorsementMemberConfig};
use endorse_domain::MemberRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEndorsementMember {
    #[serde(default)]
    pub role: MemberRole,
    pub organization: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEndorsementConfig {
    pub expression: Option<String>,
    pub members: Vec<FileEndorsementMember>,
}

impl FileEndorsementConfig {
    /// Resolve into the application config, defaulting to every organization.
    pub fn to_endorsement_config(&self, organizations: &[String]) -> EndorsementConfig {
        let members = if self.members.is_empty() {
            organizations
                .iter()
                .map(|org| EndorsementMemberConfig {
                    role: MemberRole::Member,
                    organization: org.clone(),
                })
                .collect()
        } else {
            self.members
                .iter()
                .map(|m| EndorsementMemberConfig {
                    role: m.role,
                    organization: m.organization.clone(),
                })
                .collect()
        };

        EndorsementConfig {
            members,
            expression: self
                .expression
                .clone()
                .unwrap_or_else(|| "1-of".to_string()),
        }
    }
}
