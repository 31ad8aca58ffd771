//! Version ledger use case
//!
//! Derives the latest deployed version of a unit from what an organization's
//! peers report as installed. The network has no version registry of its own.

use crate::client_cache::ClientCache;
use crate::config::{ExecutionParams, NetworkConfig};
use crate::ports::ledger_network::NetworkError;
use crate::use_cases::shared::bounded;
use endorse_domain::{InstalledUnit, latest_installed};
use std::sync::Arc;
use tracing::debug;

pub struct VersionLedger {
    cache: Arc<ClientCache>,
    config: Arc<NetworkConfig>,
    params: ExecutionParams,
}

impl VersionLedger {
    pub fn new(cache: Arc<ClientCache>, config: Arc<NetworkConfig>, params: ExecutionParams) -> Self {
        Self {
            cache,
            config,
            params,
        }
    }

    /// Units installed on one representative peer of `organization`.
    pub async fn installed_units(
        &self,
        organization: &str,
    ) -> Result<Vec<InstalledUnit>, NetworkError> {
        self.config
            .organization(organization)
            .map_err(|e| NetworkError::Configuration(e.to_string()))?;

        let client = self.cache.get(organization).await?;
        bounded(
            self.params.proposal_timeout,
            "installed-unit query",
            client.installed_units(organization),
        )
        .await
    }

    /// Highest installed version of `unit` on `organization`, or the baseline.
    pub async fn latest_version(
        &self,
        unit: &str,
        organization: &str,
    ) -> Result<String, NetworkError> {
        let installed = self.installed_units(organization).await?;
        let latest = latest_installed(&installed, unit);
        debug!(
            "Latest version of {} on {}: {} ({} units reported)",
            unit,
            organization,
            latest,
            installed.len()
        );
        Ok(latest)
    }
}
