//! Deployment domain
//!
//! A deployment walks a fixed state machine:
//!
//! ```text
//! ComputeVersion ──► InstallPerOrg ──┬──► AllFailed
//!                                    └──► InstantiateOnce ──► Done
//! ```
//!
//! Install is retried per organization; instantiate or upgrade runs exactly
//! once against the primary organization.

pub mod entities;

pub use entities::{
    AttemptOutcome, DeploymentAttempt, DeploymentPhase, DeploymentReport, OrgFailure,
};
