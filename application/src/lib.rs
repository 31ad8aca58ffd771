//! Application layer for endorse
//!
//! This crate contains use cases, port definitions, application configuration
//! and the per-organization client cache. It depends only on the domain layer.

pub mod client_cache;
pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use client_cache::ClientCache;
pub use config::{ExecutionParams, NetworkConfig};
pub use ports::{
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    ledger_network::{LedgerNetwork, NetworkConnector, NetworkError},
    progress::{DeployProgressNotifier, NoProgress},
};
pub use use_cases::channel_admin::{
    ChannelAdminUseCase, ChannelError, ChannelJoinOutcome, ChannelUpdateOutcome,
};
pub use use_cases::controller::{
    CallRequest, ChannelConfigRequest, ChannelJoinRequest, DeployRequest, InstalledRequest,
    LedgerController, VersionRequest,
};
pub use use_cases::deploy_unit::{DeployError, DeployInput, DeployUnitUseCase};
pub use use_cases::transaction::{CallInput, CallOutcome, TransactionError, TransactionPipeline};
pub use use_cases::version_ledger::VersionLedger;
