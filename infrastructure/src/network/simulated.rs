//! In-memory ledger network
//!
//! [`SimulatedNetwork`] holds the shared ledger (installed units per peer,
//! instantiated units per channel, world state, channels, committed
//! transactions) plus injectable faults. Each organization talks to it
//! through its own [`SimulatedLedger`] client, which implements the
//! [`LedgerNetwork`] port with the same call shapes as a real network:
//! proposals execute without side effects, commits apply write sets.

use super::identity::AdminIdentity;
use super::world::{
    ChannelRecord, InstantiatedUnit, LedgerSnapshot, PendingChange, PendingTransaction,
    STATUS_UNIT_ERROR, execute,
};
use async_trait::async_trait;
use endorse_application::config::NetworkConfig;
use endorse_application::ports::ledger_network::{
    ChannelUpdateRequest, CommitResponse, ConfigSignature, InstallRequest, InstantiateRequest,
    LedgerNetwork, NetworkError, ORDERER_SUCCESS, PeerRef, ProposalHandle, ProposalRequest,
};
use endorse_domain::{InstalledUnit, ProposalResult, TargetScope, TransactionId};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Status a peer reports when it cannot be reached.
pub const STATUS_UNAVAILABLE: u16 = 503;

#[derive(Debug, Default)]
struct Faults {
    offline: HashSet<String>,
    diverging: HashSet<String>,
    failing_installs: HashMap<String, usize>,
}

/// Shared state of the simulated network.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    world: Mutex<LedgerSnapshot>,
    faults: Mutex<Faults>,
    state_file: Option<PathBuf>,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            world: Mutex::new(LedgerSnapshot::default()),
            faults: Mutex::new(Faults::default()),
            state_file: None,
        }
    }

    /// Create a network backed by a snapshot file, loading it if it exists.
    pub async fn open(config: NetworkConfig, path: &Path) -> Result<Self, NetworkError> {
        let snapshot = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                NetworkError::Configuration(format!(
                    "corrupt ledger snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerSnapshot::default(),
            Err(e) => {
                return Err(NetworkError::Configuration(format!(
                    "cannot read ledger snapshot {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        debug!("Loaded ledger snapshot from {}", path.display());

        Ok(Self {
            config,
            world: Mutex::new(snapshot),
            faults: Mutex::new(Faults::default()),
            state_file: Some(path.to_path_buf()),
        })
    }

    /// Write the ledger to its snapshot file, if one is configured.
    pub async fn persist(&self) -> Result<(), NetworkError> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| NetworkError::Configuration(e.to_string()))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| NetworkError::Configuration(e.to_string()))?;
        }
        tokio::fs::write(path, bytes).await.map_err(|e| {
            NetworkError::Configuration(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!("Ledger snapshot written to {}", path.display());
        Ok(())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.world().clone()
    }

    // ==================== Fault Injection ====================

    /// Make `peer` unreachable (or reachable again).
    pub fn set_offline(&self, peer: &str, offline: bool) {
        let mut faults = self.faults();
        if offline {
            faults.offline.insert(peer.to_string());
        } else {
            faults.offline.remove(peer);
        }
    }

    /// Make `peer` return results that differ from every other peer.
    pub fn set_diverging(&self, peer: &str, diverging: bool) {
        let mut faults = self.faults();
        if diverging {
            faults.diverging.insert(peer.to_string());
        } else {
            faults.diverging.remove(peer);
        }
    }

    /// Reject the next `count` install attempts of `organization`.
    pub fn fail_installs(&self, organization: &str, count: usize) {
        self.faults()
            .failing_installs
            .insert(organization.to_string(), count);
    }

    // ==================== Internals ====================

    fn world(&self) -> MutexGuard<'_, LedgerSnapshot> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_offline(&self, peer: &str) -> bool {
        self.faults().offline.contains(peer)
    }

    fn is_diverging(&self, peer: &str) -> bool {
        self.faults().diverging.contains(peer)
    }

    fn take_install_failure(&self, organization: &str) -> bool {
        match self.faults().failing_installs.get_mut(organization) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn peers(&self, organization: &str) -> Result<Vec<PeerRef>, NetworkError> {
        let org = self
            .config
            .organization(organization)
            .map_err(|e| NetworkError::Configuration(e.to_string()))?;
        Ok(org
            .peers
            .iter()
            .map(|p| PeerRef {
                name: p.name.clone(),
                organization: org.name.clone(),
                url: p.url.clone(),
            })
            .collect())
    }

    fn unreachable(peer: &PeerRef) -> ProposalResult {
        ProposalResult::failure(
            &peer.name,
            &peer.organization,
            STATUS_UNAVAILABLE,
            format!("peer {} at {} is unreachable", peer.name, peer.url),
        )
    }

    /// Fail fast when no target is reachable, like a client whose every
    /// connection attempt errors out.
    fn ensure_reachable(&self, targets: &[PeerRef]) -> Result<(), NetworkError> {
        if targets.iter().all(|p| self.is_offline(&p.name)) {
            let names: Vec<&str> = targets.iter().map(|p| p.name.as_str()).collect();
            return Err(NetworkError::PeerUnreachable(names.join(", ")));
        }
        Ok(())
    }

    /// Turn one peer's execution into its signed result.
    fn endorse(&self, peer: &PeerRef, execution: &super::world::Execution) -> ProposalResult {
        if !execution.is_success() {
            return ProposalResult::failure(
                &peer.name,
                &peer.organization,
                execution.status,
                execution.message.clone().unwrap_or_default(),
            );
        }
        let mut payload = execution.payload.clone();
        let mut endorsed = execution.endorsed_bytes();
        if self.is_diverging(&peer.name) {
            payload.extend_from_slice(format!("@{}", peer.name).as_bytes());
            endorsed.extend_from_slice(peer.name.as_bytes());
        }
        ProposalResult::success(&peer.name, &peer.organization, payload)
            .with_endorsed_bytes(endorsed)
    }

    /// Default endorsers: one reachable peer per organization in the unit's policy.
    fn default_targets(&self, channel: &str, unit: &str) -> Result<Vec<PeerRef>, NetworkError> {
        let policy_msps: Option<BTreeSet<String>> =
            self.world().instantiated_unit(channel, unit).map(|u| {
                u.policy
                    .members()
                    .iter()
                    .map(|m| m.membership_id.clone())
                    .collect()
            });

        let mut targets = Vec::new();
        for org in self.config.organizations() {
            let endorses = policy_msps
                .as_ref()
                .is_none_or(|msps| msps.contains(&org.msp_id));
            if endorses {
                let peers = self.peers(&org.name)?;
                let pick = peers
                    .iter()
                    .find(|p| !self.is_offline(&p.name))
                    .or_else(|| peers.first());
                targets.extend(pick.cloned());
            }
        }
        if targets.is_empty() {
            return Err(NetworkError::NoPeersAvailable(format!(
                "no endorsing peers for {} on {}",
                unit, channel
            )));
        }
        Ok(targets)
    }

    /// Execute a call on every target against the committed state.
    fn simulate(
        &self,
        request: &ProposalRequest,
        targets: &[PeerRef],
    ) -> (Vec<ProposalResult>, PendingTransaction) {
        let world = self.world().clone();
        let instantiated = world
            .instantiated_unit(&request.channel, &request.unit)
            .cloned();
        let state = world.world_state(&request.channel, &request.unit);
        let mut writes = Vec::new();

        let results = targets
            .iter()
            .map(|peer| {
                if self.is_offline(&peer.name) {
                    return Self::unreachable(peer);
                }
                let Some(unit) = &instantiated else {
                    return ProposalResult::failure(
                        &peer.name,
                        &peer.organization,
                        STATUS_UNIT_ERROR,
                        format!(
                            "chaincode {} not found on channel {}",
                            request.unit, request.channel
                        ),
                    );
                };
                if !world.has_installed(&peer.name, &request.unit, &unit.version) {
                    return ProposalResult::failure(
                        &peer.name,
                        &peer.organization,
                        STATUS_UNIT_ERROR,
                        format!(
                            "cannot retrieve package for chaincode {}/{}",
                            request.unit, unit.version
                        ),
                    );
                }
                let execution = execute(&request.function, &request.args, &state);
                if execution.is_success() && writes.is_empty() {
                    writes = execution.writes.clone();
                }
                self.endorse(peer, &execution)
            })
            .collect();

        let pending = PendingTransaction {
            channel: request.channel.clone(),
            unit: request.unit.clone(),
            change: PendingChange::Invoke,
            writes,
        };
        (results, pending)
    }

    fn handle(transaction_id: &TransactionId, pending: &PendingTransaction) -> ProposalHandle {
        ProposalHandle {
            transaction_id: transaction_id.clone(),
            channel: pending.channel.clone(),
            proposal: serde_json::to_vec(pending).unwrap_or_default(),
        }
    }

    /// `N` from an `N-of` expression; anything else requires one endorser.
    fn required_endorsers(expression: &str) -> usize {
        expression
            .split_once("-of")
            .and_then(|(n, _)| n.trim().parse().ok())
            .unwrap_or(1)
    }

    fn commit(
        &self,
        pending: PendingTransaction,
        endorsements: &[ProposalResult],
        transaction_id: &TransactionId,
    ) -> CommitResponse {
        let mut world = self.world();
        let reject = |status: &str, info: String| CommitResponse {
            status: status.to_string(),
            raw: json!({"status": status, "info": info, "tx_id": transaction_id.as_str()}),
        };

        if world.is_committed(transaction_id.as_str()) {
            return reject("DUPLICATE_TXID", "transaction id already committed".into());
        }
        if endorsements.is_empty() {
            return reject("ENDORSEMENT_POLICY_FAILURE", "no endorsements".into());
        }

        match &pending.change {
            PendingChange::Invoke => {
                let Some(unit) = world.instantiated_unit(&pending.channel, &pending.unit) else {
                    return reject(
                        "BAD_REQUEST",
                        format!("{} is not instantiated on {}", pending.unit, pending.channel),
                    );
                };
                let policy_msps: BTreeSet<&str> = unit
                    .policy
                    .members()
                    .iter()
                    .map(|m| m.membership_id.as_str())
                    .collect();
                let endorsing: BTreeSet<&str> = endorsements
                    .iter()
                    .filter_map(|e| self.config.msp_for_org(&e.organization).ok())
                    .filter(|msp| policy_msps.contains(msp))
                    .collect();
                let required = Self::required_endorsers(unit.policy.expression());
                if endorsing.len() < required {
                    return reject(
                        "ENDORSEMENT_POLICY_FAILURE",
                        format!("{} of {} required endorsers", endorsing.len(), required),
                    );
                }
            }
            PendingChange::Instantiate { version, policy } => {
                world
                    .instantiated
                    .entry(pending.channel.clone())
                    .or_default()
                    .insert(
                        pending.unit.clone(),
                        InstantiatedUnit {
                            version: version.clone(),
                            policy: policy.clone(),
                        },
                    );
            }
        }

        world.apply(&pending.channel, &pending.unit, &pending.writes);
        world.committed.push(transaction_id.as_str().to_string());
        info!(
            "Committed transaction {} on {}",
            transaction_id, pending.channel
        );
        CommitResponse {
            status: ORDERER_SUCCESS.to_string(),
            raw: json!({"status": ORDERER_SUCCESS, "info": "", "tx_id": transaction_id.as_str()}),
        }
    }
}

/// One organization's client of a [`SimulatedNetwork`].
pub struct SimulatedLedger {
    network: Arc<SimulatedNetwork>,
    identity: AdminIdentity,
}

impl SimulatedLedger {
    pub fn new(network: Arc<SimulatedNetwork>, identity: AdminIdentity) -> Self {
        Self { network, identity }
    }
}

#[async_trait]
impl LedgerNetwork for SimulatedLedger {
    fn organization(&self) -> &str {
        self.identity.organization()
    }

    fn creator(&self) -> Vec<u8> {
        self.identity.creator()
    }

    async fn installed_units(
        &self,
        organization: &str,
    ) -> Result<Vec<InstalledUnit>, NetworkError> {
        let targets = self.resolve_target_peers(organization, TargetScope::SinglePeer)?;
        self.network.ensure_reachable(&targets)?;
        let world = self.network.world();
        Ok(targets
            .first()
            .and_then(|peer| world.installed.get(&peer.name))
            .cloned()
            .unwrap_or_default())
    }

    async fn send_install_proposal(
        &self,
        request: &InstallRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        if request.targets.is_empty() {
            return Err(NetworkError::NoPeersAvailable(request.organization.clone()));
        }
        self.network.ensure_reachable(&request.targets)?;

        if self.network.take_install_failure(&request.organization) {
            warn!("Injected install failure for {}", request.organization);
            return Ok(request
                .targets
                .iter()
                .map(|p| {
                    ProposalResult::failure(
                        &p.name,
                        &p.organization,
                        STATUS_UNIT_ERROR,
                        "chaincode package build failed",
                    )
                })
                .collect());
        }

        let mut world = self.network.world();
        let results = request
            .targets
            .iter()
            .map(|peer| {
                if self.network.is_offline(&peer.name) {
                    return SimulatedNetwork::unreachable(peer);
                }
                // Same unit and version: the peer already holds the package
                if world.has_installed(&peer.name, &request.unit, &request.version) {
                    let message = format!(
                        "chaincode {}/{} already installed",
                        request.unit, request.version
                    );
                    return ProposalResult::success(
                        &peer.name,
                        &peer.organization,
                        message.into_bytes(),
                    );
                }
                world
                    .installed
                    .entry(peer.name.clone())
                    .or_default()
                    .push(InstalledUnit::new(&request.unit, &request.version));
                let message = format!("Installed {}/{}", request.unit, request.version);
                ProposalResult::success(&peer.name, &peer.organization, message.into_bytes())
            })
            .collect();
        debug!(
            "Install of {} {} on {}",
            request.unit, request.version, request.organization
        );
        Ok(results)
    }

    async fn send_instantiate_proposal(
        &self,
        request: &InstantiateRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError> {
        let targets =
            self.resolve_target_peers(&request.organization, TargetScope::WholeOrganization)?;
        self.network.ensure_reachable(&targets)?;

        let world = self.network.world().clone();
        let existing = world.instantiated_unit(&request.channel, &request.unit);
        let state = if request.upgrade {
            world.world_state(&request.channel, &request.unit)
        } else {
            Default::default()
        };
        let mut writes = Vec::new();

        let results = targets
            .iter()
            .map(|peer| {
                if self.network.is_offline(&peer.name) {
                    return SimulatedNetwork::unreachable(peer);
                }
                let refusal = match (request.upgrade, existing) {
                    (false, Some(_)) => Some(format!("chaincode {} already exists", request.unit)),
                    (true, None) => Some(format!(
                        "chaincode {} not instantiated on {}",
                        request.unit, request.channel
                    )),
                    _ if !world.has_installed(&peer.name, &request.unit, &request.version) => {
                        Some(format!(
                            "cannot retrieve package for chaincode {}/{}",
                            request.unit, request.version
                        ))
                    }
                    _ => None,
                };
                if let Some(message) = refusal {
                    return ProposalResult::failure(
                        &peer.name,
                        &peer.organization,
                        STATUS_UNIT_ERROR,
                        message,
                    );
                }
                let execution = execute(&request.function, &request.args, &state);
                if execution.is_success() && writes.is_empty() {
                    writes = execution.writes.clone();
                }
                self.network.endorse(peer, &execution)
            })
            .collect();

        let pending = PendingTransaction {
            channel: request.channel.clone(),
            unit: request.unit.clone(),
            change: PendingChange::Instantiate {
                version: request.version.clone(),
                policy: request.policy.clone(),
            },
            writes,
        };
        Ok((results, SimulatedNetwork::handle(&request.transaction_id, &pending)))
    }

    async fn send_transaction_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<(Vec<ProposalResult>, ProposalHandle), NetworkError> {
        let targets = match &request.targets {
            Some(targets) => targets.clone(),
            None => self.network.default_targets(&request.channel, &request.unit)?,
        };
        self.network.ensure_reachable(&targets)?;
        let (results, pending) = self.network.simulate(request, &targets);
        Ok((results, SimulatedNetwork::handle(&request.transaction_id, &pending)))
    }

    async fn send_read_proposal(
        &self,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        let targets = match &request.targets {
            Some(targets) => targets.clone(),
            None => self.network.default_targets(&request.channel, &request.unit)?,
        };
        self.network.ensure_reachable(&targets)?;
        Ok(self.network.simulate(request, &targets).0)
    }

    async fn send_commit(
        &self,
        handle: &ProposalHandle,
        endorsements: &[ProposalResult],
        transaction_id: &TransactionId,
    ) -> Result<CommitResponse, NetworkError> {
        let pending: PendingTransaction = serde_json::from_slice(&handle.proposal)
            .map_err(|e| NetworkError::OrderingService(format!("malformed proposal: {}", e)))?;
        Ok(self.network.commit(pending, endorsements, transaction_id))
    }

    fn verify_proposal_response(&self, result: &ProposalResult) -> bool {
        result.signature_valid
    }

    fn results_agree_on_content(&self, results: &[ProposalResult]) -> bool {
        results
            .windows(2)
            .all(|pair| pair[0].endorsed_bytes == pair[1].endorsed_bytes)
    }

    fn resolve_membership_id(&self, organization: &str) -> Result<String, NetworkError> {
        self.network
            .config
            .msp_for_org(organization)
            .map(str::to_string)
            .map_err(|e| NetworkError::Configuration(e.to_string()))
    }

    fn resolve_target_peers(
        &self,
        organization: &str,
        scope: TargetScope,
    ) -> Result<Vec<PeerRef>, NetworkError> {
        let peers = self.network.peers(organization)?;
        if peers.is_empty() {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()));
        }
        Ok(match scope {
            TargetScope::WholeOrganization => peers,
            TargetScope::SinglePeer => {
                let index = peers
                    .iter()
                    .position(|p| !self.network.is_offline(&p.name))
                    .unwrap_or(0);
                vec![peers[index].clone()]
            }
        })
    }

    async fn extract_channel_config(&self, envelope: &[u8]) -> Result<Vec<u8>, NetworkError> {
        let parsed: serde_json::Value = serde_json::from_slice(envelope).map_err(|e| {
            NetworkError::Rejected(format!("channel envelope is not valid JSON: {}", e))
        })?;
        let config = parsed
            .get("config")
            .ok_or_else(|| NetworkError::Rejected("envelope has no config section".to_string()))?;
        serde_json::to_vec(config).map_err(|e| NetworkError::Rejected(e.to_string()))
    }

    async fn sign_channel_config(&self, config: &[u8]) -> Result<ConfigSignature, NetworkError> {
        Ok(ConfigSignature {
            organization: self.identity.organization().to_string(),
            signature: self.identity.sign(config),
        })
    }

    async fn update_channel(
        &self,
        request: &ChannelUpdateRequest,
    ) -> Result<CommitResponse, NetworkError> {
        let mut world = self.network.world();
        let respond = |status: &str, info: &str| CommitResponse {
            status: status.to_string(),
            raw: json!({
                "status": status,
                "info": info,
                "tx_id": request.transaction_id.as_str(),
            }),
        };

        let signers: BTreeSet<&str> = request
            .signatures
            .iter()
            .map(|s| s.organization.as_str())
            .collect();
        let organizations = self.network.config.organization_names().len();

        if request.create {
            if world.channels.contains_key(&request.channel) {
                return Ok(respond("BAD_REQUEST", "channel already exists"));
            }
            if signers.is_empty() {
                return Ok(respond("BAD_REQUEST", "creation requires a signature"));
            }
        } else {
            if !world.channels.contains_key(&request.channel) {
                return Ok(respond("NOT_FOUND", "channel does not exist"));
            }
            if signers.len() * 2 <= organizations {
                return Ok(respond(
                    "FORBIDDEN",
                    "update not signed by a majority of organizations",
                ));
            }
        }

        let record = world.channels.entry(request.channel.clone()).or_default();
        record.config_digest = hex::encode(Sha256::digest(&request.config));
        record.signers = signers.iter().map(|s| s.to_string()).collect();
        world
            .committed
            .push(request.transaction_id.as_str().to_string());
        info!(
            "Channel {} {}",
            request.channel,
            if request.create { "created" } else { "updated" }
        );
        Ok(respond(ORDERER_SUCCESS, ""))
    }

    async fn join_channel(
        &self,
        channel: &str,
        targets: &[PeerRef],
    ) -> Result<Vec<ProposalResult>, NetworkError> {
        self.network.ensure_reachable(targets)?;
        let mut world = self.network.world();
        let Some(record) = world.channels.get_mut(channel) else {
            return Err(NetworkError::Rejected(format!(
                "channel {} does not exist",
                channel
            )));
        };
        Ok(targets
            .iter()
            .map(|peer| join_peer(&self.network, record, channel, peer))
            .collect())
    }

    async fn disconnect(&self) {
        debug!(
            "Client for {} ({}) disconnected",
            self.identity.organization(),
            self.identity.fingerprint()
        );
    }
}

fn join_peer(
    network: &SimulatedNetwork,
    record: &mut ChannelRecord,
    channel: &str,
    peer: &PeerRef,
) -> ProposalResult {
    if network.is_offline(&peer.name) {
        return SimulatedNetwork::unreachable(peer);
    }
    if !record.members.insert(peer.name.clone()) {
        return ProposalResult::failure(
            &peer.name,
            &peer.organization,
            STATUS_UNIT_ERROR,
            format!("ledger [{}] already exists with state [ACTIVE]", channel),
        );
    }
    ProposalResult::success(&peer.name, &peer.organization, Vec::new())
}
