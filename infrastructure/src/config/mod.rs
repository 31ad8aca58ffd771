//! Configuration file loading for endorse
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ENDORSE_*` environment variables (`ENDORSE_TIMEOUTS__INSTALL_SECONDS=600`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./endorse.toml` or `./.endorse.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/endorse/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAuditConfig, FileConfig, FileContractConfig,
    FileCredentialsConfig, FileDeployConfig, FileEndorsementConfig, FileEndorsementMember,
    FileNetworkConfig, FileOrganizationConfig, FileOutputConfig, FilePeerConfig,
    FileSimulationConfig, FileTimeoutsConfig, ORG_PLACEHOLDER,
};
pub use loader::ConfigLoader;
