//! Deploy Unit use case
//!
//! Orchestrates a deployment: compute the next version, install on every
//! requested organization with bounded per-organization retry, then
//! instantiate or upgrade exactly once on the primary organization.
//!
//! ```text
//! ComputeVersion ──▶ InstallPerOrg ──┬──▶ AllFailed            (0 installed)
//!                                    └──▶ InstantiateOnce ──▶ Done
//! ```

use crate::client_cache::ClientCache;
use crate::config::{ExecutionParams, NetworkConfig, UnitConfig};
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::ledger_network::{
    InstallRequest, InstantiateRequest, LedgerNetwork, NetworkError, NetworkVerifier,
};
use crate::ports::progress::{DeployProgressNotifier, NoProgress};
use crate::use_cases::shared::{bounded, new_transaction_id};
use crate::use_cases::version_ledger::VersionLedger;
use endorse_domain::{
    DeploymentAttempt, DeploymentPhase, DeploymentReport, DisagreementReason, DomainError,
    EndorsementPolicy, ErrorKind, OrgFailure, PolicyMember, ProposalResult, ReconcileMode,
    ReconciliationOutcome, TargetScope, TransactionId, TransientData, VersionGranularity,
    bump_version, is_baseline, reconcile,
};
use futures::future::join_all;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a deployment
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Could not determine the installed version: {0}")]
    VersionLookup(NetworkError),

    #[error("Install failed on all {} organizations", .0.len())]
    AllInstallsFailed(Vec<OrgFailure>),

    #[error("Endorsement failed during {action}: {message}")]
    Disagreement {
        action: &'static str,
        reason: DisagreementReason,
        message: String,
        results: Vec<ProposalResult>,
        report: Box<DeploymentReport>,
    },

    #[error("Ordering service returned {status} for transaction {transaction_id}")]
    OrderingRejected {
        transaction_id: String,
        status: String,
        report: Box<DeploymentReport>,
    },

    #[error("{error}")]
    Network {
        error: NetworkError,
        report: Box<DeploymentReport>,
    },
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Domain(e) => e.kind(),
            DeployError::VersionLookup(e) => e.kind(),
            DeployError::AllInstallsFailed(failures) => failures
                .first()
                .map(|f| f.kind)
                .unwrap_or(ErrorKind::TransientPeerFailure),
            DeployError::Disagreement { reason, .. } => reason.kind(),
            DeployError::OrderingRejected { .. } => ErrorKind::OrderingServiceFailure,
            DeployError::Network { error, .. } => error.kind(),
        }
    }

    /// Install outcome, when the deployment got past the install phase
    pub fn report(&self) -> Option<&DeploymentReport> {
        match self {
            DeployError::Disagreement { report, .. }
            | DeployError::OrderingRejected { report, .. }
            | DeployError::Network { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Input for the DeployUnit use case
#[derive(Debug, Clone)]
pub struct DeployInput {
    pub unit: String,
    pub channel: String,
    /// Organizations to install on; empty means every configured organization
    pub organizations: Vec<String>,
    /// Function invoked by instantiate / upgrade
    pub function: String,
    pub args: Vec<String>,
    /// Granularity for upgrades; first deployments always bump MAJOR
    pub granularity: Option<VersionGranularity>,
    pub transient: Option<TransientData>,
    /// Pre-built package bytes, sent instead of packaging the code location
    pub package: Option<Vec<u8>>,
}

impl DeployInput {
    pub fn new(unit: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            channel: channel.into(),
            organizations: Vec::new(),
            function: "init".to_string(),
            args: Vec::new(),
            granularity: None,
            transient: None,
            package: None,
        }
    }

    pub fn with_organizations(mut self, organizations: Vec<String>) -> Self {
        self.organizations = organizations;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_granularity(mut self, granularity: VersionGranularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn with_transient(mut self, transient: TransientData) -> Self {
        self.transient = Some(transient);
        self
    }

    pub fn with_package(mut self, package: Vec<u8>) -> Self {
        self.package = Some(package);
        self
    }
}

/// Install target shared by every organization of one deployment.
struct InstallPlan<'a> {
    unit: &'a UnitConfig,
    version: &'a str,
    package: Option<&'a [u8]>,
}

/// Use case for deploying a unit across organizations
pub struct DeployUnitUseCase {
    cache: Arc<ClientCache>,
    config: Arc<NetworkConfig>,
    params: ExecutionParams,
    audit: Arc<dyn AuditLogger>,
}

impl DeployUnitUseCase {
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

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: DeployInput) -> Result<DeploymentReport, DeployError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: DeployInput,
        progress: &dyn DeployProgressNotifier,
    ) -> Result<DeploymentReport, DeployError> {
        let unit = self.config.unit(&input.unit)?;
        let organizations = self.target_organizations(&input)?;
        let primary = self.config.primary_organization();

        // Phase 1: ComputeVersion
        let phase = DeploymentPhase::ComputeVersion;
        progress.on_phase_start(&phase, 1);
        let ledger = VersionLedger::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.config),
            self.params.clone(),
        );
        let previous = ledger
            .latest_version(&input.unit, primary)
            .await
            .map_err(DeployError::VersionLookup)?;
        let upgrade = !is_baseline(&previous);
        let granularity = if upgrade {
            input.granularity.unwrap_or(self.params.default_granularity)
        } else {
            VersionGranularity::Major
        };
        let version = bump_version(&previous, granularity)?;
        info!(
            "Deploying {} {} -> {} ({})",
            input.unit,
            previous,
            version,
            if upgrade { "upgrade" } else { "first deployment" }
        );
        progress.on_version_computed(&previous, &version, upgrade);
        progress.on_phase_complete(&phase);
        self.audit.log(AuditEvent::new(
            "deploy_started",
            json!({
                "unit": input.unit,
                "channel": input.channel,
                "previous_version": previous,
                "version": version,
                "organizations": organizations,
            }),
        ));

        // Phase 2: InstallPerOrg
        let phase = DeploymentPhase::InstallPerOrg;
        progress.on_phase_start(&phase, organizations.len());
        let plan = InstallPlan {
            unit,
            version: &version,
            package: input.package.as_deref(),
        };
        let attempts = join_all(
            organizations
                .iter()
                .map(|org| self.install_with_retry(org, &plan, progress)),
        )
        .await;
        progress.on_phase_complete(&phase);

        let report = DeploymentReport::from_attempts(
            &input.unit,
            &input.channel,
            &previous,
            &version,
            upgrade,
            &attempts,
        );

        if phase.next(report.installed.len()) == Some(DeploymentPhase::AllFailed) {
            error!("Install of {} failed on every organization", input.unit);
            self.audit.log(AuditEvent::new(
                "deploy_failed",
                json!({"unit": input.unit, "version": version, "failures": report.failures}),
            ));
            return Err(DeployError::AllInstallsFailed(report.failures));
        }

        // Phase 3: InstantiateOnce
        let phase = DeploymentPhase::InstantiateOnce;
        progress.on_phase_start(&phase, 1);
        let transaction_id = self.instantiate(&input, &report).await?;
        progress.on_phase_complete(&phase);

        let report = report.with_transaction_id(transaction_id.as_str());
        info!("{}", report.summary());
        self.audit.log(AuditEvent::new(
            "deploy_completed",
            json!({
                "unit": report.unit,
                "version": report.version,
                "upgrade": report.upgrade,
                "installed": report.installed,
                "failed": report.failures.iter().map(|f| &f.organization).collect::<Vec<_>>(),
                "transaction_id": report.transaction_id,
            }),
        ));
        Ok(report)
    }

    fn target_organizations(&self, input: &DeployInput) -> Result<Vec<String>, DomainError> {
        if input.organizations.is_empty() {
            return Ok(self.config.organization_names());
        }
        let mut seen = HashSet::new();
        let mut organizations = Vec::with_capacity(input.organizations.len());
        for org in &input.organizations {
            self.config.organization(org)?;
            if seen.insert(org.as_str()) {
                organizations.push(org.clone());
            }
        }
        Ok(organizations)
    }

    /// Install on one organization, retrying serially up to the attempt limit.
    async fn install_with_retry(
        &self,
        organization: &str,
        plan: &InstallPlan<'_>,
        progress: &dyn DeployProgressNotifier,
    ) -> DeploymentAttempt {
        let max_attempts = self.params.max_install_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            progress.on_install_attempt(organization, attempt);
            debug!(
                "Installing {} {} on {} (attempt {}/{})",
                plan.unit.name, plan.version, organization, attempt, max_attempts
            );

            let result = self.install_once(organization, plan).await;
            self.audit.log(AuditEvent::new(
                "install_attempt",
                json!({
                    "organization": organization,
                    "unit": plan.unit.name,
                    "version": plan.version,
                    "attempt": attempt,
                    "success": result.is_ok(),
                    "error": result.as_ref().err().map(|e| e.to_string()),
                }),
            ));

            match result {
                Ok(()) => {
                    info!("Installed {} on {}", plan.unit.name, organization);
                    progress.on_org_complete(organization, true, attempt);
                    return DeploymentAttempt::installed(
                        organization,
                        &plan.unit.name,
                        plan.version,
                        attempt,
                    );
                }
                Err(e) => {
                    let kind = e.kind();
                    if !kind.is_retryable() || attempt >= max_attempts {
                        warn!(
                            "Install on {} failed after {} attempt(s): {}",
                            organization, attempt, e
                        );
                        progress.on_org_complete(organization, false, attempt);
                        return DeploymentAttempt::failed(
                            organization,
                            &plan.unit.name,
                            plan.version,
                            attempt,
                            kind,
                            e.to_string(),
                        );
                    }
                    warn!(
                        "Install attempt {} on {} failed, retrying: {}",
                        attempt, organization, e
                    );
                    if !self.params.install_retry_backoff.is_zero() {
                        tokio::time::sleep(self.params.install_retry_backoff).await;
                    }
                }
            }
        }
    }

    /// One install attempt: every targeted peer must report success.
    async fn install_once(
        &self,
        organization: &str,
        plan: &InstallPlan<'_>,
    ) -> Result<(), NetworkError> {
        let client = self.cache.get(organization).await?;
        let targets = client.resolve_target_peers(organization, TargetScope::WholeOrganization)?;
        if targets.is_empty() {
            return Err(NetworkError::NoPeersAvailable(organization.to_string()));
        }

        let request = InstallRequest {
            organization: organization.to_string(),
            unit: plan.unit.name.clone(),
            version: plan.version.to_string(),
            code_location: plan.unit.code_location.clone(),
            language: plan.unit.language.clone(),
            package: plan.package.map(<[u8]>::to_vec),
            targets,
        };
        let results = bounded(
            self.params.install_timeout,
            "install",
            client.send_install_proposal(&request),
        )
        .await?;

        if results.is_empty() {
            return Err(NetworkError::Rejected(format!(
                "no install responses from {}",
                organization
            )));
        }
        match results.iter().find(|r| !r.is_success()) {
            Some(failed) => Err(NetworkError::Rejected(failed.detail())),
            None => Ok(()),
        }
    }

    /// Instantiate or upgrade on the primary organization. Never retried.
    async fn instantiate(
        &self,
        input: &DeployInput,
        report: &DeploymentReport,
    ) -> Result<TransactionId, DeployError> {
        let primary = self.config.primary_organization();
        let action = if report.upgrade { "upgrade" } else { "instantiate" };
        let network_error = |error: NetworkError| DeployError::Network {
            error,
            report: Box::new(report.clone()),
        };

        let client = self.cache.get(primary).await.map_err(network_error)?;
        let policy = self.endorsement_policy(client.as_ref()).map_err(network_error)?;
        let transaction_id = new_transaction_id(client.as_ref());

        let request = InstantiateRequest {
            organization: primary.to_string(),
            channel: input.channel.clone(),
            unit: input.unit.clone(),
            version: report.version.clone(),
            function: input.function.clone(),
            args: input.args.clone(),
            policy,
            transient: input.transient.clone(),
            upgrade: report.upgrade,
            transaction_id: transaction_id.clone(),
        };
        info!(
            "Sending {} proposal for {} {} on channel {}",
            action, input.unit, report.version, input.channel
        );
        let (results, handle) = bounded(
            self.params.proposal_timeout,
            action,
            client.send_instantiate_proposal(&request),
        )
        .await
        .map_err(network_error)?;

        let verifier = NetworkVerifier::new(client.as_ref());
        let endorsements = match reconcile(&results, ReconcileMode::Strict, &verifier) {
            ReconciliationOutcome::Agreed { endorsements } => endorsements,
            ReconciliationOutcome::Disagreed {
                reason,
                message,
                results,
            } => {
                error!("{} of {} not endorsed: {}", action, input.unit, message);
                return Err(DeployError::Disagreement {
                    action,
                    reason,
                    message,
                    results,
                    report: Box::new(report.clone()),
                });
            }
        };

        let response = bounded(
            self.params.commit_timeout,
            "commit",
            client.send_commit(&handle, &endorsements, &transaction_id),
        )
        .await
        .map_err(network_error)?;

        if !response.is_success() {
            error!(
                "Ordering service returned {} for {} {}",
                response.status, action, transaction_id
            );
            return Err(DeployError::OrderingRejected {
                transaction_id: transaction_id.to_string(),
                status: response.status,
                report: Box::new(report.clone()),
            });
        }
        Ok(transaction_id)
    }

    /// Policy built fresh from configuration for every instantiate / upgrade.
    fn endorsement_policy(
        &self,
        client: &dyn LedgerNetwork,
    ) -> Result<EndorsementPolicy, NetworkError> {
        let endorsement = self.config.endorsement();
        let members = endorsement
            .members
            .iter()
            .map(|m| {
                Ok(PolicyMember {
                    role: m.role,
                    membership_id: client.resolve_membership_id(&m.organization)?,
                })
            })
            .collect::<Result<Vec<_>, NetworkError>>()?;
        Ok(EndorsementPolicy::new(members, endorsement.expression.clone()))
    }
}
