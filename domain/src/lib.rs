//! Domain layer for endorse
//!
//! This crate contains the core logic for coordinating changes to a
//! replicated, multi-organization ledger. It has no dependencies on
//! infrastructure or presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Versions
//!
//! Deployable units carry `MAJOR[.MINOR[.REVISION]]` versions with an
//! optional marker. The next version is derived from what peers report as
//! installed ([`version`]).
//!
//! ## Endorsement Quorum
//!
//! Peers execute a proposal independently; their results must agree before
//! a commit ([`endorsement`]).
//!
//! - **Strict**: every endorser must succeed (instantiate / upgrade)
//! - **Resilient**: minority failures are tolerated (submit)

pub mod core;
pub mod deployment;
pub mod endorsement;
pub mod transaction;
pub mod version;

// Re-export commonly used types
pub use core::{
    args::normalize_args,
    error::{DomainError, ErrorKind},
    operation::Operation,
    outcome::OperationResult,
};
pub use deployment::{
    AttemptOutcome, DeploymentAttempt, DeploymentPhase, DeploymentReport, OrgFailure,
};
pub use endorsement::{
    DisagreementReason, EndorsementPolicy, EndorsementVerifier, MemberRole, PayloadVerifier,
    PolicyMember, ProposalResult, ReadAgreement, ReconcileMode, ReconciliationOutcome,
    reconcile, reconcile_reads,
};
pub use transaction::{PipelineMode, TargetScope, TransactionId, TransientData};
pub use version::{
    BASE_VERSION, InstalledUnit, VersionGranularity, VersionNumber, bump_version,
    compare_versions, is_baseline, latest_installed,
};
