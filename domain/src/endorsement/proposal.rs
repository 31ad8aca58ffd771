//! Proposal results reported by peers

use serde::{Deserialize, Serialize};

/// Status code a peer reports for a successful execution.
pub const STATUS_SUCCESS: u16 = 200;

/// One peer's result for a proposed transaction.
///
/// # Example
///
/// ```
/// use endorse_domain::endorsement::ProposalResult;
///
/// let ok = ProposalResult::success("peer0.org1", "Org1", b"pong".to_vec());
/// assert!(ok.is_success());
///
/// let err = ProposalResult::failure("peer0.org2", "Org2", 500, "unknown function");
/// assert!(!err.is_success());
/// assert_eq!(err.detail(), "unknown function");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResult {
    /// Peer that executed the proposal
    pub peer: String,
    /// Organization operating the peer
    pub organization: String,
    /// Execution status code
    pub status: u16,
    /// Detail message, usually only present on failure
    pub message: Option<String>,
    /// Response payload returned to the caller
    pub payload: Vec<u8>,
    /// Bytes the peer signed (results plus read/write set); compared for agreement
    pub endorsed_bytes: Vec<u8>,
    /// Signature check outcome supplied by the network client
    pub signature_valid: bool,
}

impl ProposalResult {
    pub fn success(
        peer: impl Into<String>,
        organization: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            peer: peer.into(),
            organization: organization.into(),
            status: STATUS_SUCCESS,
            message: None,
            endorsed_bytes: payload.clone(),
            payload,
            signature_valid: true,
        }
    }

    pub fn failure(
        peer: impl Into<String>,
        organization: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            peer: peer.into(),
            organization: organization.into(),
            status,
            message: Some(message.into()),
            payload: Vec::new(),
            endorsed_bytes: Vec::new(),
            signature_valid: false,
        }
    }

    pub fn with_endorsed_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.endorsed_bytes = bytes;
        self
    }

    pub fn with_signature_valid(mut self, valid: bool) -> Self {
        self.signature_valid = valid;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Detail message if the peer gave one, otherwise the raw result.
    pub fn detail(&self) -> String {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for ProposalResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "peer {} ({}) returned status {}",
            self.peer, self.organization, self.status
        )
    }
}
