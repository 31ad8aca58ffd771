//! Per-organization client cache.
//!
//! Connecting a client means loading credentials and opening connections, so
//! each organization's handle is created once and reused. The cache is an
//! explicit object: created at process start, injected into the use cases,
//! and torn down with [`ClientCache::shutdown`].
//!
//! Creation is single-flight per organization. Concurrent callers for an
//! uncached organization wait on the same slot instead of racing to create
//! duplicate handles; callers for other organizations are not blocked.

use crate::ports::ledger_network::{LedgerNetwork, NetworkConnector, NetworkError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

type Slot = Arc<OnceCell<Arc<dyn LedgerNetwork>>>;

/// Cache of connected clients keyed by organization name.
pub struct ClientCache {
    connector: Arc<dyn NetworkConnector>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ClientCache {
    pub fn new(connector: Arc<dyn NetworkConnector>) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get the client for `organization`, connecting on first use.
    ///
    /// A failed connection leaves the slot empty so a later call can retry.
    pub async fn get(&self, organization: &str) -> Result<Arc<dyn LedgerNetwork>, NetworkError> {
        let slot = self.slot(organization)?;

        let client = slot
            .get_or_try_init(|| async {
                debug!("Connecting client for organization {}", organization);
                let client = self.connector.connect(organization).await?;
                info!("Client for organization {} connected", organization);
                Ok::<_, NetworkError>(client)
            })
            .await?;

        Ok(Arc::clone(client))
    }

    /// Organizations with a connected client.
    pub fn cached_organizations(&self) -> Vec<String> {
        let Ok(slots) = self.slots.lock() else {
            return Vec::new();
        };
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Disconnect every cached client and empty the cache.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Slot)> = match self.slots.lock() {
            Ok(mut slots) => slots.drain().collect(),
            Err(_) => return,
        };

        for (organization, slot) in drained {
            if let Some(client) = slot.get() {
                debug!("Disconnecting client for organization {}", organization);
                client.disconnect().await;
            }
        }
        info!("Client cache shut down");
    }

    fn slot(&self, organization: &str) -> Result<Slot, NetworkError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| NetworkError::Connection("client cache lock poisoned".to_string()))?;
        Ok(Arc::clone(
            slots.entry(organization.to_string()).or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, FakeNetwork};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_same_handle_is_reused() {
        let connector = Arc::new(FakeConnector::new(FakeNetwork::new(&["org1"])));
        let cache = ClientCache::new(connector.clone());

        let a = cache.get("org1").await.unwrap();
        let b = cache.get("org1").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_organizations(), vec!["org1"]);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_once() {
        let connector = Arc::new(
            FakeConnector::new(FakeNetwork::new(&["org1", "org2"]))
                .with_connect_delay(std::time::Duration::from_millis(20)),
        );
        let cache = Arc::new(ClientCache::new(connector.clone()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            let org = if i % 2 == 0 { "org1" } else { "org2" };
            handles.push(tokio::spawn(async move { cache.get(org).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_connect_can_be_retried() {
        let connector = Arc::new(FakeConnector::new(FakeNetwork::new(&["org1"])).failing_first(1));
        let cache = ClientCache::new(connector.clone());

        assert!(cache.get("org1").await.is_err());
        assert!(cache.cached_organizations().is_empty());
        assert!(cache.get("org1").await.is_ok());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_empties_cache() {
        let network = FakeNetwork::new(&["org1"]);
        let connector = Arc::new(FakeConnector::new(network.clone()));
        let cache = ClientCache::new(connector);

        cache.get("org1").await.unwrap();
        cache.shutdown().await;

        assert!(cache.cached_organizations().is_empty());
        assert_eq!(network.state().disconnects, 1);
    }
}
