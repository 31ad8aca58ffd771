//! Ledger network port
//!
//! Defines the interface to the ledger-network client. Peer execution,
//! ordering, identity and cryptography all live behind this trait; the use
//! cases only orchestrate calls and reconcile what comes back.

use async_trait::async_trait;
use endorse_domain::{
    EndorsementPolicy, EndorsementVerifier, ErrorKind, InstalledUnit, ProposalResult,
    TargetScope, TransactionId, TransientData,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Status the ordering service reports for an accepted commit.
pub const ORDERER_SUCCESS: &str = "SUCCESS";

/// Errors that can occur during ledger network operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("No peers available for organization {0}")]
    NoPeersAvailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("Proposal rejected: {0}")]
    Rejected(String),

    #[error("Ordering service error: {0}")]
    OrderingService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl NetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::NoPeersAvailable(_) => ErrorKind::NoPeersAvailable,
            NetworkError::Timeout(_) => ErrorKind::Timeout,
            NetworkError::PeerUnreachable(_) | NetworkError::Connection(_) => {
                ErrorKind::TransientPeerFailure
            }
            NetworkError::Rejected(_) => ErrorKind::PeerRejected,
            NetworkError::OrderingService(_) => ErrorKind::OrderingServiceFailure,
            NetworkError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// A peer a proposal can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerRef {
    pub name: String,
    pub organization: String,
    pub url: String,
}

/// Install a unit's code on the given peers of one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub organization: String,
    pub unit: String,
    pub version: String,
    pub code_location: String,
    pub language: String,
    /// Pre-built package; when absent the client packages `code_location`
    pub package: Option<Vec<u8>>,
    pub targets: Vec<PeerRef>,
}

/// Instantiate (first deployment) or upgrade a unit on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiateRequest {
    pub organization: String,
    pub channel: String,
    pub unit: String,
    pub version: String,
    pub function: String,
    pub args: Vec<String>,
    pub policy: EndorsementPolicy,
    pub transient: Option<TransientData>,
    pub upgrade: bool,
    pub transaction_id: TransactionId,
}

/// A call against an instantiated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRequest {
    pub organization: String,
    pub channel: String,
    pub unit: String,
    pub function: String,
    pub args: Vec<String>,
    pub transient: Option<TransientData>,
    /// Explicit targets; `None` lets the client pick what the policy requires
    pub targets: Option<Vec<PeerRef>>,
    pub transaction_id: TransactionId,
}

/// Opaque handle on a sent proposal, needed to commit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalHandle {
    pub transaction_id: TransactionId,
    pub channel: String,
    pub proposal: Vec<u8>,
}

/// Ordering service acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResponse {
    pub status: String,
    pub raw: serde_json::Value,
}

impl CommitResponse {
    pub fn is_success(&self) -> bool {
        self.status == ORDERER_SUCCESS
    }
}

/// One organization's signature over a channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSignature {
    pub organization: String,
    pub signature: Vec<u8>,
}

/// Create or update a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdateRequest {
    pub channel: String,
    pub config: Vec<u8>,
    pub signatures: Vec<ConfigSignature>,
    pub transaction_id: TransactionId,
    pub create: bool,
}

/// Connected ledger-network client, acting as one organization's admin.
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Organization whose identity this client signs with
    fn organization(&self) -> &str;

    /// Serialized creator identity, mixed into transaction ids
    fn creator(&self) -> Vec<u8>;

    /// Units installed on one representative peer of `organization`
    async fn installed_units(&self, organization: &str)
    -> Result<Vec<InstalledUnit>, NetworkError>;

    async fn send_install_proposal(
        &self,
        request: &InstallRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError>;

    async fn send_instantiate_proposal(
        &self,
        request: &InstantiateRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError>;

    async fn send_transaction_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError>;

    async fn send_read_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError>;

    /// Submit endorsed results plus the original proposal to the ordering service
    async fn send_commit(
        &self,
        handle: &ProposalHandle,
        endorsements: &[ProposalResult],
        transaction_id: &TransactionId,
    ) -> Result<CommitResponse, NetworkError>;

    fn verify_proposal_response(&self, result: &ProposalResult) -> bool;

    fn results_agree_on_content(&self, results: &[ProposalResult]) -> bool;

    fn resolve_membership_id(&self, organization: &str) -> Result<String, NetworkError>;

    fn resolve_target_peers(
        &self,
        organization: &str,
        scope: TargetScope,
    ) -> Result<Vec<PeerRef>, NetworkError>;

    async fn extract_channel_config(&self, envelope: &[u8]) -> Result<Vec<u8>, NetworkError>;

    async fn sign_channel_config(&self, config: &[u8]) -> Result<ConfigSignature, NetworkError>;

    async fn update_channel(
        &self,
        request: &ChannelUpdateRequest,
    ) -> Result<CommitResponse, NetworkError>;

    async fn join_channel(
        &self,
        channel: &str,
        targets: &[PeerRef],
    ) -> Result<Vec<ProposalResult>, NetworkError>;

    /// Release connections held by this client
    async fn disconnect(&self) {}
}

/// Creates connected clients for an organization.
#[async_trait]
pub trait NetworkConnector: Send + Sync {
    async fn connect(&self, organization: &str) -> Result<Arc<dyn LedgerNetwork>, NetworkError>;
}

/// Adapter: [`LedgerNetwork`] → [`EndorsementVerifier`]
///
/// Lets the domain reconciler use the client's verification primitives.
pub struct NetworkVerifier<'a> {
    network: &'a dyn LedgerNetwork,
}

impl<'a> NetworkVerifier<'a> {
    pub fn new(network: &'a dyn LedgerNetwork) -> Self {
        Self { network }
    }
}

impl EndorsementVerifier for NetworkVerifier<'_> {
    fn verify(&self, result: &ProposalResult) -> bool {
        self.network.verify_proposal_response(result)
    }

    fn agree_on_content(&self, results: &[ProposalResult]) -> bool {
        self.network.results_agree_on_content(results)
    }
}
