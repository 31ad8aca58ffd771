//! Execution parameters: timeouts and retry control.
//!
//! [`ExecutionParams`] groups the static parameters that bound how long a
//! call may take and how often an install is retried. These are
//! application-layer concerns, not domain policy.

use endorse_domain::VersionGranularity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Install attempts allowed per organization.
pub const DEFAULT_MAX_INSTALL_ATTEMPTS: usize = 3;

/// Timeout and retry parameters.
///
/// Install gets a long timeout (code transfer plus peer-side build); every
/// other proposal and commit gets a short one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Deadline for one install attempt.
    pub install_timeout: Duration,
    /// Deadline for an ordinary proposal (instantiate, submit, evaluate).
    pub proposal_timeout: Duration,
    /// Deadline for an ordering-service commit.
    pub commit_timeout: Duration,
    /// Install attempts per organization, including the first.
    pub max_install_attempts: usize,
    /// Pause between failed install attempts of one organization.
    pub install_retry_backoff: Duration,
    /// Granularity used when the caller does not pick one.
    pub default_granularity: VersionGranularity,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            install_timeout: Duration::from_secs(300),
            proposal_timeout: Duration::from_secs(30),
            commit_timeout: Duration::from_secs(30),
            max_install_attempts: DEFAULT_MAX_INSTALL_ATTEMPTS,
            install_retry_backoff: Duration::from_secs(2),
            default_granularity: VersionGranularity::Minor,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn with_proposal_timeout(mut self, timeout: Duration) -> Self {
        self.proposal_timeout = timeout;
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn with_max_install_attempts(mut self, attempts: usize) -> Self {
        self.max_install_attempts = attempts.max(1);
        self
    }

    pub fn with_install_retry_backoff(mut self, backoff: Duration) -> Self {
        self.install_retry_backoff = backoff;
        self
    }

    pub fn with_default_granularity(mut self, granularity: VersionGranularity) -> Self {
        self.default_granularity = granularity;
        self
    }
}
