//! Connector handing out simulated-network clients

use super::identity::AdminIdentity;
use super::simulated::{SimulatedLedger, SimulatedNetwork};
use async_trait::async_trait;
use endorse_application::{LedgerNetwork, NetworkConnector, NetworkError};
use std::sync::Arc;
use tracing::info;

/// Creates one [`SimulatedLedger`] per organization, each signing with the
/// admin identity loaded from that organization's credential files.
pub struct SimulatedConnector {
    network: Arc<SimulatedNetwork>,
}

impl SimulatedConnector {
    pub fn new(network: Arc<SimulatedNetwork>) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &Arc<SimulatedNetwork> {
        &self.network
    }
}

#[async_trait]
impl NetworkConnector for SimulatedConnector {
    async fn connect(&self, organization: &str) -> Result<Arc<dyn LedgerNetwork>, NetworkError> {
        let config = self
            .network
            .config()
            .organization(organization)
            .map_err(|e| NetworkError::Configuration(e.to_string()))?;
        let identity = AdminIdentity::load(config).await?;
        info!(
            "Connected to simulated network as {} ({})",
            identity.msp_id(),
            identity.fingerprint()
        );
        Ok(Arc::new(SimulatedLedger::new(
            Arc::clone(&self.network),
            identity,
        )))
    }
}
