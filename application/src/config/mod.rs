//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`ExecutionParams`]: per-call timeouts and the bounded install retry policy
//! - [`NetworkConfig`]: organizations, primary organization, endorsement members, units

pub mod execution_params;
pub mod network_config;

pub use execution_params::ExecutionParams;
pub use network_config::{
    EndorsementConfig, EndorsementMemberConfig, NetworkConfig, OrganizationConfig, PeerConfig,
    UnitConfig,
};
