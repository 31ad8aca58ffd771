//! Timeout and deploy configuration from TOML (`[timeouts]`, `[deploy]`)
//!
//! ```toml
//! [timeouts]
//! install_seconds = 300    # code transfer plus peer-side build
//! proposal_seconds = 30
//! commit_seconds = 30
//!
//! [deploy]
//! max_install_attempts = 3
//! retry_backoff_ms = 2000
//! default_granularity = "minor"
//! ```

use endorse_application::config::execution_params::DEFAULT_MAX_INSTALL_ATTEMPTS;
use endorse_domain::VersionGranularity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    pub install_seconds: u64,
    pub proposal_seconds: u64,
    pub commit_seconds: u64,
}

impl Default for FileTimeoutsConfig {
    fn default() -> Self {
        Self {
            install_seconds: 300,
            proposal_seconds: 30,
            commit_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeployConfig {
    pub max_install_attempts: usize,
    pub retry_backoff_ms: u64,
    pub default_granularity: VersionGranularity,
}

impl Default for FileDeployConfig {
    fn default() -> Self {
        Self {
            max_install_attempts: DEFAULT_MAX_INSTALL_ATTEMPTS,
            retry_backoff_ms: 2000,
            default_granularity: VersionGranularity::Minor,
        }
    }
}
