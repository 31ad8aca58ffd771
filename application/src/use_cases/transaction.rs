//! Transaction pipeline use case
//!
//! One pipeline serves both kinds of call against an instantiated unit:
//!
//! - [`PipelineMode::Commit`] (submit): propose, reconcile resiliently, commit
//! - [`PipelineMode::NoCommit`] (evaluate): propose, reconcile reads
//!
//! Proposal building and target selection are shared so both stay consistent.

use crate::client_cache::ClientCache;
use crate::config::{ExecutionParams, NetworkConfig};
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::ledger_network::{
    LedgerNetwork, NetworkError, NetworkVerifier, PeerRef, ProposalHandle, ProposalRequest,
};
use crate::use_cases::shared::{bounded, new_transaction_id};
use endorse_domain::endorsement::parse_best_effort;
use endorse_domain::{
    DisagreementReason, DomainError, ErrorKind, PipelineMode, ProposalResult, ReadAgreement, ReconcileMode,
    ReconciliationOutcome, TargetScope, TransactionId, TransientData, reconcile, reconcile_reads,
};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from submit and evaluate
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Endorsement failed: {message}")]
    Disagreement {
        reason: DisagreementReason,
        message: String,
        results: Vec<ProposalResult>,
    },

    #[error("Peer rejected the query: {message}")]
    Rejected {
        message: String,
        results: Vec<ProposalResult>,
    },

    #[error("Peers returned different values for the query")]
    ReadMismatch {
        /// Best-effort parse of the first mismatching value
        value: Value,
        results: Vec<ProposalResult>,
    },

    #[error("Ordering service returned {status} for transaction {transaction_id}")]
    OrderingRejected {
        transaction_id: String,
        status: String,
        raw: Value,
    },
}

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::Domain(e) => e.kind(),
            TransactionError::Network(e) => e.kind(),
            TransactionError::Disagreement { reason, .. } => reason.kind(),
            TransactionError::ReadMismatch { .. } => ErrorKind::EndorsementDisagreement,
            TransactionError::Rejected { .. } => ErrorKind::PeerRejected,
            TransactionError::OrderingRejected { .. } => ErrorKind::OrderingServiceFailure,
        }
    }
}

/// A call against an instantiated unit
#[derive(Debug, Clone)]
pub struct CallInput {
    pub unit: String,
    pub channel: String,
    pub function: String,
    pub args: Vec<String>,
    pub transient: Option<TransientData>,
    /// Organization to act as; defaults to the primary organization
    pub organization: Option<String>,
    /// Submit only: endorse on one peer instead of what the policy requires
    pub single_peer: bool,
}

impl CallInput {
    pub fn new(
        unit: impl Into<String>,
        channel: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            channel: channel.into(),
            function: function.into(),
            args,
            transient: None,
            organization: None,
            single_peer: false,
        }
    }

    pub fn with_transient(mut self, transient: TransientData) -> Self {
        self.transient = Some(transient);
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn single_peer(mut self) -> Self {
        self.single_peer = true;
        self
    }
}

/// Successful pipeline result
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Ordered and committed
    Committed {
        transaction_id: TransactionId,
        payload: Value,
    },
    /// Every queried peer returned the same value
    Read(ReadAgreement),
}

/// Use case running submit and evaluate calls
pub struct TransactionPipeline {
    cache: Arc<ClientCache>,
    config: Arc<NetworkConfig>,
    params: ExecutionParams,
    audit: Arc<dyn AuditLogger>,
}

impl TransactionPipeline {
    pub fn new(cache: Arc<ClientCache>, config: Arc<NetworkConfig>, params: ExecutionParams) -> Self {
        Self {
            cache,
            config,
            params,
            audit: Arc::new(NoAuditLogger),
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn submit(&self, input: &CallInput) -> Result<CallOutcome, TransactionError> {
        self.run(PipelineMode::Commit, input).await
    }

    pub async fn evaluate(&self, input: &CallInput) -> Result<CallOutcome, TransactionError> {
        self.run(PipelineMode::NoCommit, input).await
    }

    /// Run one attempt of the pipeline in `mode`.
    pub async fn run(
        &self,
        mode: PipelineMode,
        input: &CallInput,
    ) -> Result<CallOutcome, TransactionError> {
        let organization = self
            .config
            .resolve_organization(input.organization.as_deref())?;
        let client = self.cache.get(organization).await?;

        let targets = self.select_targets(client.as_ref(), organization, mode, input)?;
        let transaction_id = new_transaction_id(client.as_ref());
        let request = ProposalRequest {
            organization: organization.to_string(),
            channel: input.channel.clone(),
            unit: input.unit.clone(),
            function: input.function.clone(),
            args: input.args.clone(),
            transient: input.transient.clone(),
            targets,
            transaction_id,
        };
        debug!(
            "Proposing {}:{} on channel {} as {} ({:?})",
            request.unit, request.function, request.channel, organization, mode
        );

        match mode {
            PipelineMode::Commit => self.propose_and_commit(client.as_ref(), &request).await,
            PipelineMode::NoCommit => self.propose_and_read(client.as_ref(), &request).await,
        }
    }

    fn select_targets(
        &self,
        client: &dyn LedgerNetwork,
        organization: &str,
        mode: PipelineMode,
        input: &CallInput,
    ) -> Result<Option<Vec<PeerRef>>, NetworkError> {
        let scope = match mode {
            PipelineMode::Commit if input.single_peer => TargetScope::SinglePeer,
            PipelineMode::Commit => return Ok(None),
            PipelineMode::NoCommit => self.config.query_scope(),
        };
        let targets = client.resolve_target_peers(organization, scope)?;
        if targets.is_empty() {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()));
        }
        Ok(Some(targets))
    }

    async fn propose_and_commit(
        &self,
        client: &dyn LedgerNetwork,
        request: &ProposalRequest,
    ) -> Result<CallOutcome, TransactionError> {
        let (results, handle) = bounded(
            self.params.proposal_timeout,
            "transaction proposal",
            client.send_transaction_proposal(request),
        )
        .await?;

        let verifier = NetworkVerifier::new(client);
        let endorsements = match reconcile(&results, ReconcileMode::Resilient, &verifier) {
            ReconciliationOutcome::Agreed { endorsements } => endorsements,
            ReconciliationOutcome::Disagreed {
                reason,
                message,
                results,
            } => {
                warn!("Submit {}:{} not endorsed: {}", request.unit, request.function, message);
                return Err(TransactionError::Disagreement {
                    reason,
                    message,
                    results,
                });
            }
        };
        if endorsements.len() < results.len() {
            warn!(
                "Dropped {} failed endorsement(s) for {}",
                results.len() - endorsements.len(),
                request.transaction_id
            );
        }

        self.commit(client, &handle, &endorsements, request).await
    }

    async fn commit(
        &self,
        client: &dyn LedgerNetwork,
        handle: &ProposalHandle,
        endorsements: &[ProposalResult],
        request: &ProposalRequest,
    ) -> Result<CallOutcome, TransactionError> {
        let transaction_id = &request.transaction_id;
        let response = bounded(
            self.params.commit_timeout,
            "commit",
            client.send_commit(handle, endorsements, transaction_id),
        )
        .await?;

        self.audit.log(AuditEvent::new(
            "transaction_submitted",
            json!({
                "unit": request.unit,
                "channel": request.channel,
                "function": request.function,
                "transaction_id": transaction_id,
                "endorsements": endorsements.len(),
                "status": response.status,
            }),
        ));

        if !response.is_success() {
            warn!(
                "Ordering service returned {} for {}",
                response.status, transaction_id
            );
            return Err(TransactionError::OrderingRejected {
                transaction_id: transaction_id.to_string(),
                status: response.status,
                raw: response.raw,
            });
        }

        info!("Transaction {} committed", transaction_id);
        let payload = endorsements
            .first()
            .map(|e| parse_best_effort(&e.payload))
            .unwrap_or(Value::Null);
        Ok(CallOutcome::Committed {
            transaction_id: transaction_id.clone(),
            payload,
        })
    }

    async fn propose_and_read(
        &self,
        client: &dyn LedgerNetwork,
        request: &ProposalRequest,
    ) -> Result<CallOutcome, TransactionError> {
        let results = bounded(
            self.params.proposal_timeout,
            "query",
            client.send_read_proposal(request),
        )
        .await?;

        if let Some(failed) = results.iter().find(|r| !r.is_success()) {
            return Err(TransactionError::Rejected {
                message: failed.detail(),
                results,
            });
        }

        let payloads: Vec<Vec<u8>> = results.iter().map(|r| r.payload.clone()).collect();
        let agreement = reconcile_reads(&payloads);

        self.audit.log(AuditEvent::new(
            "transaction_evaluated",
            json!({
                "unit": request.unit,
                "channel": request.channel,
                "function": request.function,
                "peers": results.len(),
                "all_agree": agreement.all_agree,
            }),
        ));

        if !agreement.all_agree {
            warn!(
                "Query {}:{} returned diverging values from {} peers",
                request.unit,
                request.function,
                results.len()
            );
            return Err(TransactionError::ReadMismatch {
                value: agreement.value,
                results,
            });
        }
        Ok(CallOutcome::Read(agreement))
    }
}
