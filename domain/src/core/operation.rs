//! Operation dispatch table.
//!
//! Request names map onto a closed set of typed operations. Unknown names
//! are an explicit error instead of a failed method lookup.

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// A request handler the controller can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Install on every organization, then instantiate or upgrade once
    Deploy,
    /// State-changing call: propose, reconcile, commit
    Submit,
    /// Read-only call: propose, reconcile reads
    Evaluate,
    /// Highest installed version of a unit on one organization
    LatestVersion,
    /// Units installed on one organization's representative peer
    Installed,
    ChannelCreate,
    ChannelUpdate,
    ChannelJoin,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Deploy,
        Operation::Submit,
        Operation::Evaluate,
        Operation::LatestVersion,
        Operation::Installed,
        Operation::ChannelCreate,
        Operation::ChannelUpdate,
        Operation::ChannelJoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deploy => "deploy",
            Operation::Submit => "submit",
            Operation::Evaluate => "evaluate",
            Operation::LatestVersion => "latest-version",
            Operation::Installed => "installed",
            Operation::ChannelCreate => "channel-create",
            Operation::ChannelUpdate => "channel-update",
            Operation::ChannelJoin => "channel-join",
        }
    }

    /// Whether the operation may change ledger or peer state.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Operation::Evaluate | Operation::LatestVersion | Operation::Installed
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "deploy" | "install" => Ok(Operation::Deploy),
            "submit" | "invoke" => Ok(Operation::Submit),
            "evaluate" | "query" => Ok(Operation::Evaluate),
            "latest-version" | "latest" => Ok(Operation::LatestVersion),
            "installed" => Ok(Operation::Installed),
            "channel-create" => Ok(Operation::ChannelCreate),
            "channel-update" => Ok(Operation::ChannelUpdate),
            "channel-join" => Ok(Operation::ChannelJoin),
            _ => Err(DomainError::UnknownOperation(s.to_string())),
        }
    }
}
