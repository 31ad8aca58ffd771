//! Domain error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of failures surfaced to callers.
///
/// Use-case errors map onto exactly one kind so the request layer can branch
/// on the failure without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or inconsistent organization/unit configuration
    Configuration,
    /// The organization has no reachable peers
    NoPeersAvailable,
    /// A peer was temporarily unreachable or failed in a retryable way
    TransientPeerFailure,
    /// A peer explicitly rejected the proposal
    PeerRejected,
    /// A per-call deadline elapsed
    Timeout,
    /// Endorsers disagreed or failed; never retried automatically
    EndorsementDisagreement,
    /// The ordering service did not acknowledge the commit
    OrderingServiceFailure,
    /// A version string could not be parsed
    MalformedVersion,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::NoPeersAvailable => "no_peers_available",
            ErrorKind::TransientPeerFailure => "transient_peer_failure",
            ErrorKind::PeerRejected => "peer_rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::EndorsementDisagreement => "endorsement_disagreement",
            ErrorKind::OrderingServiceFailure => "ordering_service_failure",
            ErrorKind::MalformedVersion => "malformed_version",
        }
    }

    /// Whether the bounded install retry loop may try again after this kind.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::TransientPeerFailure | ErrorKind::PeerRejected | ErrorKind::Timeout
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidVersion(_) => ErrorKind::MalformedVersion,
            DomainError::Configuration(_)
            | DomainError::UnknownOperation(_)
            | DomainError::InvalidRequest(_) => ErrorKind::Configuration,
        }
    }
}
