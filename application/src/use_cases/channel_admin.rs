//! Channel administration use case
//!
//! Channel creation and configuration updates need signatures from the
//! network's organizations. Signatures are gathered concurrently; an
//! organization that cannot sign is skipped so the ordering service can
//! decide whether the remaining signatures satisfy the channel policy.

use crate::client_cache::ClientCache;
use crate::config::{ExecutionParams, NetworkConfig};
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::ledger_network::{ChannelUpdateRequest, ConfigSignature, NetworkError};
use crate::use_cases::shared::{bounded, new_transaction_id};
use endorse_domain::{DomainError, ErrorKind, ProposalResult, TargetScope};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Ordering service returned {status} for channel {channel}")]
    OrderingRejected {
        channel: String,
        status: String,
        raw: Value,
    },

    #[error("No peer of {organization} joined channel {channel}")]
    JoinFailed {
        organization: String,
        channel: String,
        results: Vec<ProposalResult>,
    },
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::Domain(e) => e.kind(),
            ChannelError::Network(e) => e.kind(),
            ChannelError::OrderingRejected { .. } => ErrorKind::OrderingServiceFailure,
            ChannelError::JoinFailed { .. } => ErrorKind::PeerRejected,
        }
    }
}

/// Accepted channel create / update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelUpdateOutcome {
    pub channel: String,
    pub transaction_id: String,
    /// Organizations whose signature was attached
    pub signed_by: Vec<String>,
}

/// Per-peer result of a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelJoinOutcome {
    pub channel: String,
    pub joined: Vec<String>,
    pub failed: Vec<String>,
}

pub struct ChannelAdminUseCase {
    cache: Arc<ClientCache>,
    config: Arc<NetworkConfig>,
    params: ExecutionParams,
    audit: Arc<dyn AuditLogger>,
}

impl ChannelAdminUseCase {
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

    pub async fn create_channel(
        &self,
        organization: Option<&str>,
        channel: &str,
        envelope: &[u8],
    ) -> Result<ChannelUpdateOutcome, ChannelError> {
        self.apply(organization, channel, envelope, true).await
    }

    pub async fn update_channel(
        &self,
        organization: Option<&str>,
        channel: &str,
        envelope: &[u8],
    ) -> Result<ChannelUpdateOutcome, ChannelError> {
        self.apply(organization, channel, envelope, false).await
    }

    async fn apply(
        &self,
        organization: Option<&str>,
        channel: &str,
        envelope: &[u8],
        create: bool,
    ) -> Result<ChannelUpdateOutcome, ChannelError> {
        let organization = self.config.resolve_organization(organization)?;
        let client = self.cache.get(organization).await?;
        let action = if create { "create" } else { "update" };

        let config = bounded(
            self.params.proposal_timeout,
            "channel config extraction",
            client.extract_channel_config(envelope),
        )
        .await?;
        let own = bounded(
            self.params.proposal_timeout,
            "channel config signing",
            client.sign_channel_config(&config),
        )
        .await?;

        let others: Vec<String> = self
            .config
            .organization_names()
            .into_iter()
            .filter(|o| o != organization)
            .collect();
        let gathered = join_all(others.iter().map(|o| self.sign_as(o, &config))).await;

        let mut signatures = vec![own];
        for (org, result) in others.iter().zip(gathered) {
            match result {
                Ok(signature) => signatures.push(signature),
                Err(e) => warn!("Organization {} did not sign {} config: {}", org, channel, e),
            }
        }
        let signed_by: Vec<String> = signatures.iter().map(|s| s.organization.clone()).collect();

        let transaction_id = new_transaction_id(client.as_ref());
        let request = ChannelUpdateRequest {
            channel: channel.to_string(),
            config,
            signatures,
            transaction_id: transaction_id.clone(),
            create,
        };
        info!(
            "Submitting channel {} {} with {} signature(s)",
            action,
            channel,
            signed_by.len()
        );
        let response = bounded(
            self.params.commit_timeout,
            "channel update",
            client.update_channel(&request),
        )
        .await?;

        self.audit.log(AuditEvent::new(
            "channel_updated",
            json!({
                "channel": channel,
                "create": create,
                "signed_by": signed_by,
                "transaction_id": transaction_id,
                "status": response.status,
            }),
        ));

        if !response.is_success() {
            return Err(ChannelError::OrderingRejected {
                channel: channel.to_string(),
                status: response.status,
                raw: response.raw,
            });
        }
        Ok(ChannelUpdateOutcome {
            channel: channel.to_string(),
            transaction_id: transaction_id.to_string(),
            signed_by,
        })
    }

    async fn sign_as(
        &self,
        organization: &str,
        config: &[u8],
    ) -> Result<ConfigSignature, NetworkError> {
        let client = self.cache.get(organization).await?;
        bounded(
            self.params.proposal_timeout,
            "channel config signing",
            client.sign_channel_config(config),
        )
        .await
    }

    /// Join every peer of `organization` to `channel`.
    ///
    /// Succeeds when at least one peer joined.
    pub async fn join_channel(
        &self,
        organization: Option<&str>,
        channel: &str,
    ) -> Result<ChannelJoinOutcome, ChannelError> {
        let organization = self.config.resolve_organization(organization)?;
        let client = self.cache.get(organization).await?;
        let targets = client.resolve_target_peers(organization, TargetScope::WholeOrganization)?;
        if targets.is_empty() {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()).into());
        }

        let results = bounded(
            self.params.proposal_timeout,
            "channel join",
            client.join_channel(channel, &targets),
        )
        .await?;

        let (joined, failed): (Vec<&ProposalResult>, Vec<&ProposalResult>) =
            results.iter().partition(|r| r.is_success());
        for result in &failed {
            warn!("Peer {} failed to join {}: {}", result.peer, channel, result.detail());
        }
        if joined.is_empty() {
            return Err(ChannelError::JoinFailed {
                organization: organization.to_string(),
                channel: channel.to_string(),
                results,
            });
        }

        info!("{} peer(s) of {} joined {}", joined.len(), organization, channel);
        Ok(ChannelJoinOutcome {
            channel: channel.to_string(),
            joined: joined.iter().map(|r| r.peer.clone()).collect(),
            failed: failed.iter().map(|r| r.peer.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::network_config::fixtures;
    use crate::testing::{FakeConnector, FakeNetwork};

    const ORGS: [&str; 3] = ["org1", "org2", "org3"];

    fn admin(network: &FakeNetwork) -> ChannelAdminUseCase {
        ChannelAdminUseCase::new(
            Arc::new(ClientCache::new(Arc::new(FakeConnector::new(network.clone())))),
            Arc::new(fixtures::network(&ORGS)),
            ExecutionParams::default(),
        )
    }

    #[tokio::test]
    async fn test_update_collects_every_signature() {
        let network = FakeNetwork::new(&ORGS);

        let outcome = admin(&network)
            .update_channel(None, "ch1", b"{}")
            .await
            .unwrap();

        assert_eq!(outcome.signed_by, vec!["org1", "org2", "org3"]);
        let updates = network.state().channel_updates;
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].create);
        assert_eq!(updates[0].transaction_id.as_str(), outcome.transaction_id);
    }

    #[tokio::test]
    async fn test_unsigned_org_is_skipped() {
        let network = FakeNetwork::new(&ORGS);
        network.edit(|s| {
            s.unsignable.insert("org3".to_string());
        });

        let outcome = admin(&network)
            .create_channel(Some("org2"), "ch2", b"{}")
            .await
            .unwrap();

        assert_eq!(outcome.signed_by, vec!["org2", "org1"]);
        assert!(network.state().channel_updates[0].create);
    }

    #[tokio::test]
    async fn test_orderer_rejection() {
        let network = FakeNetwork::new(&ORGS);
        network.edit(|s| s.commit_status = Some("FORBIDDEN".to_string()));

        let err = admin(&network)
            .update_channel(None, "ch1", b"{}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OrderingServiceFailure);
    }

    #[tokio::test]
    async fn test_join_succeeds_with_one_peer() {
        let network = FakeNetwork::new(&ORGS);
        network.edit(|s| {
            s.join_results = Some(vec![
                ProposalResult::success("peer0.org1", "org1", Vec::new()),
                ProposalResult::failure("peer1.org1", "org1", 500, "already joined"),
            ]);
        });

        let outcome = admin(&network).join_channel(None, "ch1").await.unwrap();
        assert_eq!(outcome.joined, vec!["peer0.org1"]);
        assert_eq!(outcome.failed, vec!["peer1.org1"]);
    }

    #[tokio::test]
    async fn test_join_fails_when_no_peer_joins() {
        let network = FakeNetwork::new(&ORGS);
        network.edit(|s| {
            s.join_results = Some(vec![ProposalResult::failure(
                "peer0.org1",
                "org1",
                500,
                "bad block",
            )]);
        });

        let err = admin(&network).join_channel(None, "ch1").await.unwrap_err();
        assert!(matches!(err, ChannelError::JoinFailed { .. }));
    }
}
