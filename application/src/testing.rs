//! Scripted in-memory network for use-case tests.

use crate::ports::ledger_network::{
    ChannelUpdateRequest, CommitResponse, ConfigSignature, InstallRequest, InstantiateRequest,
    LedgerNetwork, NetworkConnector, NetworkError, PeerRef, ProposalHandle, ProposalRequest,
};
use async_trait::async_trait;
use endorse_domain::{InstalledUnit, ProposalResult, TargetScope, TransactionId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a scripted install attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallFailure {
    /// Peers answer with status 500
    Rejected,
    /// The client cannot reach the peers
    Unreachable,
    /// The call never returns within the install timeout
    Hang,
}

#[derive(Debug, Clone, Default)]
pub struct FakeState {
    pub installed: HashMap<String, Vec<InstalledUnit>>,
    pub peerless: HashSet<String>,
    pub install_failures: HashMap<String, (usize, InstallFailure)>,
    pub install_calls: Vec<(String, String)>,
    pub instantiate_calls: Vec<InstantiateRequest>,
    pub instantiate_results: Option<Vec<ProposalResult>>,
    pub transaction_results: Option<Vec<ProposalResult>>,
    pub transaction_proposals: Vec<ProposalRequest>,
    pub read_results: Option<Vec<ProposalResult>>,
    pub read_proposals: Vec<ProposalRequest>,
    pub commits: Vec<(TransactionId, TransactionId, usize)>,
    pub commit_status: Option<String>,
    pub channel_updates: Vec<ChannelUpdateRequest>,
    pub unsignable: HashSet<String>,
    pub join_results: Option<Vec<ProposalResult>>,
    pub disconnects: usize,
}

/// Network double shared by every organization's client.
#[derive(Clone)]
pub struct FakeNetwork {
    organization: String,
    organizations: Vec<String>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeNetwork {
    pub fn new(organizations: &[&str]) -> Self {
        Self {
            organization: organizations[0].to_string(),
            organizations: organizations.iter().map(|o| o.to_string()).collect(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Same network, signing as another organization.
    pub fn as_org(&self, organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            organizations: self.organizations.clone(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn state(&self) -> FakeState {
        self.state.lock().unwrap().clone()
    }

    pub fn edit(&self, f: impl FnOnce(&mut FakeState)) -> &Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_installed(self, organization: &str, unit: &str, version: &str) -> Self {
        self.edit(|s| {
            s.installed
                .entry(organization.to_string())
                .or_default()
                .push(InstalledUnit::new(unit, version))
        });
        self
    }

    pub fn with_install_failures(
        self,
        organization: &str,
        count: usize,
        failure: InstallFailure,
    ) -> Self {
        self.edit(|s| {
            s.install_failures
                .insert(organization.to_string(), (count, failure));
        });
        self
    }

    fn peers(&self, organization: &str) -> Vec<PeerRef> {
        (0..2)
            .map(|i| PeerRef {
                name: format!("peer{}.{}", i, organization),
                organization: organization.to_string(),
                url: format!("grpcs://peer{}.{}:7051", i, organization),
            })
            .collect()
    }

    fn endorse_all(&self, peers: &[PeerRef], payload: &[u8]) -> Vec<ProposalResult> {
        peers
            .iter()
            .map(|p| ProposalResult::success(&p.name, &p.organization, payload.to_vec()))
            .collect()
    }

    fn handle(&self, transaction_id: &TransactionId, channel: &str) -> ProposalHandle {
        ProposalHandle {
            transaction_id: transaction_id.clone(),
            channel: channel.to_string(),
            proposal: transaction_id.as_str().as_bytes().to_vec(),
        }
    }
}

#[async_trait]
impl LedgerNetwork for FakeNetwork {
    fn organization(&self) -> &str {
        &self.organization
    }

    fn creator(&self) -> Vec<u8> {
        format!("{}MSP", self.organization).into_bytes()
    }

    async fn installed_units(
        &self,
        organization: &str,
    ) -> Result<Vec<InstalledUnit>, NetworkError> {
        let state = self.state.lock().unwrap();
        if state.peerless.contains(organization) {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()));
        }
        Ok(state.installed.get(organization).cloned().unwrap_or_default())
    }

    async fn send_install_proposal(
        &self,
        request: &InstallRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        let failure = {
            let mut state = self.state.lock().unwrap();
            state
                .install_calls
                .push((request.organization.clone(), request.version.clone()));
            match state.install_failures.get_mut(&request.organization) {
                Some((remaining, failure)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(*failure)
                }
                _ => None,
            }
        };

        match failure {
            Some(InstallFailure::Rejected) => Ok(request
                .targets
                .iter()
                .map(|p| ProposalResult::failure(&p.name, &p.organization, 500, "install failed"))
                .collect()),
            Some(InstallFailure::Unreachable) => Err(NetworkError::PeerUnreachable(format!(
                "peers of {} unreachable",
                request.organization
            ))),
            Some(InstallFailure::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(NetworkError::PeerUnreachable("hung".to_string()))
            }
            None => {
                self.state
                    .lock()
                    .unwrap()
                    .installed
                    .entry(request.organization.clone())
                    .or_default()
                    .push(InstalledUnit::new(&request.unit, &request.version));
                Ok(self.endorse_all(&request.targets, b"installed"))
            }
        }
    }

    async fn send_instantiate_proposal(
        &self,
        request: &InstantiateRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.instantiate_calls.push(request.clone());
        let results = state
            .instantiate_results
            .clone()
            .unwrap_or_else(|| self.endorse_all(&self.peers(&request.organization), b"init"));
        Ok((results, self.handle(&request.transaction_id, &request.channel)))
    }

    async fn send_transaction_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.transaction_proposals.push(request.clone());
        let results = state.transaction_results.clone().unwrap_or_else(|| {
            let peers: Vec<PeerRef> = self
                .organizations
                .iter()
                .flat_map(|o| self.peers(o).into_iter().take(1))
                .collect();
            self.endorse_all(&peers, b"stored")
        });
        Ok((results, self.handle(&request.transaction_id, &request.channel)))
    }

    async fn send_read_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.read_proposals.push(request.clone());
        Ok(state.read_results.clone().unwrap_or_else(|| {
            let targets = request.targets.clone().unwrap_or_default();
            self.endorse_all(&targets, b"value")
        }))
    }

    async fn send_commit(
        &self,
        handle: &ProposalHandle,
        endorsements: &[ProposalResult],
        transaction_id: &TransactionId,
    ) -> Result<CommitResponse, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.commits.push((
            handle.transaction_id.clone(),
            transaction_id.clone(),
            endorsements.len(),
        ));
        Ok(CommitResponse {
            status: state
                .commit_status
                .clone()
                .unwrap_or_else(|| "SUCCESS".to_string()),
            raw: serde_json::json!({"tx_id": transaction_id.as_str()}),
        })
    }

    fn verify_proposal_response(&self, result: &ProposalResult) -> bool {
        result.signature_valid
    }

    fn results_agree_on_content(&self, results: &[ProposalResult]) -> bool {
        results
            .windows(2)
            .all(|w| w[0].endorsed_bytes == w[1].endorsed_bytes)
    }

    fn resolve_membership_id(&self, organization: &str) -> Result<String, NetworkError> {
        Ok(format!("{}MSP", organization))
    }

    fn resolve_target_peers(
        &self,
        organization: &str,
        scope: TargetScope,
    ) -> Result<Vec<PeerRef>, NetworkError> {
        if self.state.lock().unwrap().peerless.contains(organization) {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()));
        }
        let peers = self.peers(organization);
        Ok(match scope {
            TargetScope::SinglePeer => peers.into_iter().take(1).collect(),
            TargetScope::WholeOrganization => peers,
        })
    }

    async fn extract_channel_config(&self, envelope: &[u8]) -> Result<Vec<u8>, NetworkError> {
        Ok(envelope.to_vec())
    }

    async fn sign_channel_config(&self, config: &[u8]) -> Result<ConfigSignature, NetworkError> {
        if self
            .state
            .lock()
            .unwrap()
            .unsignable
            .contains(&self.organization)
        {
            return Err(NetworkError::Connection("signer offline".to_string()));
        }
        let mut signature = self.organization.as_bytes().to_vec();
        signature.extend_from_slice(config);
        Ok(ConfigSignature {
            organization: self.organization.clone(),
            signature,
        })
    }

    async fn update_channel(
        &self,
        request: &ChannelUpdateRequest,
    ) -> Result<CommitResponse, NetworkError> {
        let mut state = self.state.lock().unwrap();
        state.channel_updates.push(request.clone());
        Ok(CommitResponse {
            status: state
                .commit_status
                .clone()
                .unwrap_or_else(|| "SUCCESS".to_string()),
            raw: serde_json::Value::Null,
        })
    }

    async fn join_channel(
        &self,
        _channel: &str,
        targets: &[PeerRef],
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .join_results
            .clone()
            .unwrap_or_else(|| self.endorse_all(targets, b"joined")))
    }

    async fn disconnect(&self) {
        self.state.lock().unwrap().disconnects += 1;
    }
}

/// Connector handing out [`FakeNetwork`] clients, counting connections.
pub struct FakeConnector {
    network: FakeNetwork,
    pub connects: AtomicUsize,
    fail_first: AtomicUsize,
    delay: Duration,
}

impl FakeConnector {
    pub fn new(network: FakeNetwork) -> Self {
        Self {
            network,
            connects: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, count: usize) -> Self {
        self.fail_first.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl NetworkConnector for FakeConnector {
    async fn connect(&self, organization: &str) -> Result<Arc<dyn LedgerNetwork>, NetworkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failing = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NetworkError::Connection("credentials unavailable".to_string()));
        }
        Ok(Arc::new(self.network.as_org(organization)))
    }
}
