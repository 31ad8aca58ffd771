//! Ledger controller
//!
//! Facade the request layer talks to. Every entry point returns an
//! [`OperationResult`]; failures carry the error kind and the raw failing or
//! disagreeing results in `output`.
//!
//! Requests can also be dispatched by operation name with a JSON body, which
//! is how the `call` command and any wire front-end reach the use cases.

use crate::client_cache::ClientCache;
use crate::config::{ExecutionParams, NetworkConfig};
use crate::ports::audit_logger::AuditLogger;
use crate::ports::progress::{DeployProgressNotifier, NoProgress};
use crate::use_cases::channel_admin::{ChannelAdminUseCase, ChannelError};
use crate::use_cases::deploy_unit::{DeployError, DeployInput, DeployUnitUseCase};
use crate::use_cases::shared::describe_results;
use crate::use_cases::transaction::{CallInput, CallOutcome, TransactionError, TransactionPipeline};
use crate::use_cases::version_ledger::VersionLedger;
use endorse_domain::{
    ErrorKind, Operation, OperationResult, TransientData, VersionGranularity, normalize_args,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

fn default_init_function() -> String {
    "init".to_string()
}

fn transient_bytes(transient: &BTreeMap<String, String>) -> Option<TransientData> {
    if transient.is_empty() {
        return None;
    }
    Some(
        transient
            .iter()
            .map(|(k, v)| (k.clone(), v.as_bytes().to_vec()))
            .collect(),
    )
}

/// Body of a `deploy` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub unit: String,
    pub channel: String,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default = "default_init_function")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub granularity: Option<VersionGranularity>,
    #[serde(default)]
    pub transient: BTreeMap<String, String>,
    /// Pre-built package; only set by local callers
    #[serde(skip)]
    pub package: Option<Vec<u8>>,
}

impl DeployRequest {
    fn into_input(self) -> DeployInput {
        let mut input = DeployInput::new(self.unit, self.channel)
            .with_organizations(self.organizations)
            .with_function(self.function)
            .with_args(normalize_args(&self.args));
        if let Some(granularity) = self.granularity {
            input = input.with_granularity(granularity);
        }
        if let Some(transient) = transient_bytes(&self.transient) {
            input = input.with_transient(transient);
        }
        if let Some(package) = self.package {
            input = input.with_package(package);
        }
        input
    }
}

/// Body of a `submit` or `evaluate` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub unit: String,
    pub channel: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub transient: BTreeMap<String, String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub single_peer: bool,
}

impl CallRequest {
    fn to_input(&self) -> CallInput {
        let mut input = CallInput::new(
            &self.unit,
            &self.channel,
            &self.function,
            normalize_args(&self.args),
        );
        if let Some(transient) = transient_bytes(&self.transient) {
            input = input.with_transient(transient);
        }
        if let Some(org) = &self.organization {
            input = input.with_organization(org);
        }
        if self.single_peer {
            input = input.single_peer();
        }
        input
    }
}

/// Body of a `latest-version` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRequest {
    pub unit: String,
    #[serde(default)]
    pub organization: Option<String>,
}

/// Body of an `installed` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledRequest {
    #[serde(default)]
    pub organization: Option<String>,
}

/// Body of a `channel-create` or `channel-update` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfigRequest {
    pub channel: String,
    /// Channel configuration envelope as produced by the network tooling
    pub envelope: String,
    #[serde(default)]
    pub organization: Option<String>,
}

/// Body of a `channel-join` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelJoinRequest {
    pub channel: String,
    #[serde(default)]
    pub organization: Option<String>,
}

fn failure(kind: ErrorKind, message: impl Into<String>, details: Value) -> OperationResult {
    let mut output = json!({ "kind": kind });
    if let (Some(map), Value::Object(extra)) = (output.as_object_mut(), details) {
        map.extend(extra);
    }
    OperationResult::failed(message, output)
}

/// Entry points exposed to the request layer
pub struct LedgerController {
    config: Arc<NetworkConfig>,
    cache: Arc<ClientCache>,
    versions: VersionLedger,
    deployer: DeployUnitUseCase,
    pipeline: TransactionPipeline,
    channels: ChannelAdminUseCase,
}

impl LedgerController {
    pub fn new(cache: Arc<ClientCache>, config: Arc<NetworkConfig>, params: ExecutionParams) -> Self {
        Self {
            versions: VersionLedger::new(Arc::clone(&cache), Arc::clone(&config), params.clone()),
            deployer: DeployUnitUseCase::new(
                Arc::clone(&cache),
                Arc::clone(&config),
                params.clone(),
            ),
            pipeline: TransactionPipeline::new(
                Arc::clone(&cache),
                Arc::clone(&config),
                params.clone(),
            ),
            channels: ChannelAdminUseCase::new(Arc::clone(&cache), Arc::clone(&config), params),
            config,
            cache,
        }
    }

    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.deployer = self.deployer.with_audit_logger(Arc::clone(&audit));
        self.pipeline = self.pipeline.with_audit_logger(Arc::clone(&audit));
        self.channels = self.channels.with_audit_logger(audit);
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Install everywhere, then instantiate or upgrade once.
    pub async fn deploy(
        &self,
        request: DeployRequest,
        progress: &dyn DeployProgressNotifier,
    ) -> OperationResult {
        match self
            .deployer
            .execute_with_progress(request.into_input(), progress)
            .await
        {
            Ok(report) => {
                let output = serde_json::to_value(&report).unwrap_or(Value::Null);
                OperationResult::ok(report.summary(), output)
            }
            Err(e) => deploy_failure(&e),
        }
    }

    pub async fn submit(&self, request: &CallRequest) -> OperationResult {
        match self.pipeline.submit(&request.to_input()).await {
            Ok(CallOutcome::Committed {
                transaction_id,
                payload,
            }) => OperationResult::ok(
                format!("Transaction {} committed", transaction_id),
                json!({ "transaction_id": transaction_id, "payload": payload }),
            ),
            Ok(CallOutcome::Read(agreement)) => {
                OperationResult::ok("Transaction completed", agreement.value)
            }
            Err(e) => transaction_failure(&e),
        }
    }

    pub async fn evaluate(&self, request: &CallRequest) -> OperationResult {
        match self.pipeline.evaluate(&request.to_input()).await {
            Ok(CallOutcome::Read(agreement)) => {
                OperationResult::ok("Query successful", agreement.value)
            }
            Ok(CallOutcome::Committed { payload, .. }) => {
                OperationResult::ok("Query successful", payload)
            }
            Err(e) => transaction_failure(&e),
        }
    }

    pub async fn latest_version(&self, unit: &str, organization: Option<&str>) -> OperationResult {
        let organization = match self.config.resolve_organization(organization) {
            Ok(org) => org,
            Err(e) => return failure(e.kind(), e.to_string(), Value::Null),
        };
        match self.versions.latest_version(unit, organization).await {
            Ok(version) => OperationResult::ok(
                format!("Latest version of {} on {} is {}", unit, organization, version),
                Value::String(version),
            ),
            Err(e) => failure(e.kind(), e.to_string(), Value::Null),
        }
    }

    pub async fn installed_units(&self, organization: Option<&str>) -> OperationResult {
        let organization = match self.config.resolve_organization(organization) {
            Ok(org) => org,
            Err(e) => return failure(e.kind(), e.to_string(), Value::Null),
        };
        match self.versions.installed_units(organization).await {
            Ok(units) => OperationResult::ok(
                format!("{} unit(s) installed on {}", units.len(), organization),
                serde_json::to_value(&units).unwrap_or(Value::Null),
            ),
            Err(e) => failure(e.kind(), e.to_string(), Value::Null),
        }
    }

    pub async fn create_channel(&self, request: &ChannelConfigRequest) -> OperationResult {
        let result = self
            .channels
            .create_channel(
                request.organization.as_deref(),
                &request.channel,
                request.envelope.as_bytes(),
            )
            .await;
        match result {
            Ok(outcome) => OperationResult::ok(
                format!("Channel {} created", outcome.channel),
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            ),
            Err(e) => channel_failure(&e),
        }
    }

    pub async fn update_channel(&self, request: &ChannelConfigRequest) -> OperationResult {
        let result = self
            .channels
            .update_channel(
                request.organization.as_deref(),
                &request.channel,
                request.envelope.as_bytes(),
            )
            .await;
        match result {
            Ok(outcome) => OperationResult::ok(
                format!("Channel {} updated", outcome.channel),
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            ),
            Err(e) => channel_failure(&e),
        }
    }

    pub async fn join_channel(&self, request: &ChannelJoinRequest) -> OperationResult {
        match self
            .channels
            .join_channel(request.organization.as_deref(), &request.channel)
            .await
        {
            Ok(outcome) => OperationResult::ok(
                format!(
                    "{} peer(s) joined channel {}",
                    outcome.joined.len(),
                    outcome.channel
                ),
                serde_json::to_value(&outcome).unwrap_or(Value::Null),
            ),
            Err(e) => channel_failure(&e),
        }
    }

    /// Run the operation named `name` with a JSON request body.
    pub async fn dispatch(&self, name: &str, body: Value) -> OperationResult {
        let operation = match name.parse::<Operation>() {
            Ok(op) => op,
            Err(e) => return failure(e.kind(), e.to_string(), Value::Null),
        };
        debug!("Dispatching {} as {}", name, operation);

        match operation {
            Operation::Deploy => match parse_body::<DeployRequest>(operation, body) {
                Ok(request) => self.deploy(request, &NoProgress).await,
                Err(result) => result,
            },
            Operation::Submit => match parse_body::<CallRequest>(operation, body) {
                Ok(request) => self.submit(&request).await,
                Err(result) => result,
            },
            Operation::Evaluate => match parse_body::<CallRequest>(operation, body) {
                Ok(request) => self.evaluate(&request).await,
                Err(result) => result,
            },
            Operation::LatestVersion => match parse_body::<VersionRequest>(operation, body) {
                Ok(request) => {
                    self.latest_version(&request.unit, request.organization.as_deref())
                        .await
                }
                Err(result) => result,
            },
            Operation::Installed => {
                let body = if body.is_null() { json!({}) } else { body };
                match parse_body::<InstalledRequest>(operation, body) {
                    Ok(request) => self.installed_units(request.organization.as_deref()).await,
                    Err(result) => result,
                }
            }
            Operation::ChannelCreate => match parse_body::<ChannelConfigRequest>(operation, body) {
                Ok(request) => self.create_channel(&request).await,
                Err(result) => result,
            },
            Operation::ChannelUpdate => match parse_body::<ChannelConfigRequest>(operation, body) {
                Ok(request) => self.update_channel(&request).await,
                Err(result) => result,
            },
            Operation::ChannelJoin => match parse_body::<ChannelJoinRequest>(operation, body) {
                Ok(request) => self.join_channel(&request).await,
                Err(result) => result,
            },
        }
    }

    /// Disconnect every cached client.
    pub async fn shutdown(&self) {
        info!("Shutting down ledger controller");
        self.cache.shutdown().await;
    }
}

fn parse_body<T: DeserializeOwned>(operation: Operation, body: Value) -> Result<T, OperationResult> {
    serde_json::from_value(body).map_err(|e| {
        failure(
            ErrorKind::Configuration,
            format!("Invalid request for {}: {}", operation, e),
            Value::Null,
        )
    })
}

fn deploy_failure(error: &DeployError) -> OperationResult {
    let report = error
        .report()
        .and_then(|r| serde_json::to_value(r).ok())
        .unwrap_or(Value::Null);
    let details = match error {
        DeployError::AllInstallsFailed(failures) => json!({ "failures": failures }),
        DeployError::Disagreement {
            reason, results, ..
        } => json!({
            "reason": reason,
            "results": describe_results(results),
            "report": report,
        }),
        DeployError::OrderingRejected {
            transaction_id,
            status,
            ..
        } => json!({
            "transaction_id": transaction_id,
            "status": status,
            "report": report,
        }),
        _ => json!({ "report": report }),
    };
    failure(error.kind(), error.to_string(), details)
}

fn transaction_failure(error: &TransactionError) -> OperationResult {
    let details = match error {
        TransactionError::Disagreement {
            reason, results, ..
        } => json!({
            "reason": reason,
            "results": describe_results(results),
        }),
        TransactionError::Rejected { results, .. } => {
            json!({ "results": describe_results(results) })
        }
        TransactionError::ReadMismatch { value, results } => json!({
            "value": value,
            "results": describe_results(results),
        }),
        TransactionError::OrderingRejected {
            transaction_id,
            status,
            raw,
        } => json!({
            "transaction_id": transaction_id,
            "status": status,
            "raw": raw,
        }),
        _ => Value::Null,
    };
    failure(error.kind(), error.to_string(), details)
}

fn channel_failure(error: &ChannelError) -> OperationResult {
    let details = match error {
        ChannelError::OrderingRejected { status, raw, .. } => {
            json!({ "status": status, "raw": raw })
        }
        ChannelError::JoinFailed { results, .. } => json!({ "results": describe_results(results) }),
        _ => Value::Null,
    };
    failure(error.kind(), error.to_string(), details)
}
