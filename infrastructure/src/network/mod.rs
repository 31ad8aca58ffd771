//! Simulated ledger network adapter
//!
//! A deterministic, in-process implementation of the ledger ports, used as
//! the development network by the binary and as an integration fixture.

pub mod connector;
pub mod identity;
pub mod simulated;
pub mod world;

pub use connector::SimulatedConnector;
pub use identity::AdminIdentity;
pub use simulated::{SimulatedLedger, SimulatedNetwork};
pub use world::LedgerSnapshot;

#[cfg(test)]
mod tests {
    use super::*;
    use endorse_application::config::{
        EndorsementConfig, EndorsementMemberConfig, NetworkConfig, OrganizationConfig,
        PeerConfig, UnitConfig,
    };
    use endorse_application::{
        CallRequest, ChannelConfigRequest, ChannelJoinRequest, ClientCache, DeployRequest,
        ExecutionParams, LedgerController, NoProgress,
    };
    use endorse_domain::{ErrorKind, MemberRole, TargetScope};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    fn network_config() -> NetworkConfig {
        let orgs = ["org1", "org2"];
        let organizations = orgs
            .iter()
            .map(|name| OrganizationConfig {
                name: name.to_string(),
                msp_id: format!("{}MSP", name),
                peers: (0..2)
                    .map(|i| PeerConfig {
                        name: format!("peer{}.{}", i, name),
                        url: format!("grpc://peer{}.{}:7051", i, name),
                    })
                    .collect(),
                signed_cert: None,
                admin_private_key: None,
            })
            .collect();
        let endorsement = EndorsementConfig {
            members: orgs
                .iter()
                .map(|o| EndorsementMemberConfig {
                    role: MemberRole::Member,
                    organization: o.to_string(),
                })
                .collect(),
            expression: "2-of".to_string(),
        };
        let units = vec![UnitConfig {
            name: "kv".to_string(),
            code_location: "units/kv".to_string(),
            language: "golang".to_string(),
        }];
        NetworkConfig::new(
            "org1",
            organizations,
            units,
            endorsement,
            TargetScope::WholeOrganization,
        )
        .unwrap()
    }

    fn controller() -> (Arc<SimulatedNetwork>, LedgerController) {
        let config = network_config();
        let network = Arc::new(SimulatedNetwork::new(config.clone()));
        let cache = Arc::new(ClientCache::new(Arc::new(SimulatedConnector::new(
            Arc::clone(&network),
        ))));
        let params = ExecutionParams::default().with_install_retry_backoff(Duration::ZERO);
        (network, LedgerController::new(cache, Arc::new(config), params))
    }

    fn deploy_request() -> DeployRequest {
        serde_json::from_value(json!({"unit": "kv", "channel": "ch", "args": ["color", "red"]}))
            .unwrap()
    }

    fn call(function: &str, args: &[&str]) -> CallRequest {
        serde_json::from_value(json!({
            "unit": "kv",
            "channel": "ch",
            "function": function,
            "args": args,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_deploy_submit_evaluate_upgrade() {
        let (_network, controller) = controller();

        let first = controller.deploy(deploy_request(), &NoProgress).await;
        assert!(first.success, "{}", first.message);
        assert_eq!(first.output["version"], "v1.0.0");

        let read = controller.evaluate(&call("get", &["color"])).await;
        assert!(read.success, "{}", read.message);
        assert_eq!(read.output, json!("red"));

        let submit = controller.submit(&call("put", &["color", "blue"])).await;
        assert!(submit.success, "{}", submit.message);
        assert_eq!(submit.output["payload"], json!(["color", "blue"]));

        let read = controller.evaluate(&call("get", &["color"])).await;
        assert_eq!(read.output, json!("blue"));

        let second = controller
            .deploy(
                serde_json::from_value(json!({"unit": "kv", "channel": "ch"})).unwrap(),
                &NoProgress,
            )
            .await;
        assert!(second.success, "{}", second.message);
        assert_eq!(second.output["version"], "v1.1.0");
        assert_eq!(second.output["upgrade"], true);

        let latest = controller.latest_version("kv", Some("org2")).await;
        assert_eq!(latest.output, json!("v1.1.0"));

        let read = controller.evaluate(&call("get", &["color"])).await;
        assert_eq!(read.output, json!("blue"));
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_install_retry_recovers() {
        let (network, controller) = controller();
        network.fail_installs("org2", 2);

        let result = controller.deploy(deploy_request(), &NoProgress).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.output["installed"], json!(["org1", "org2"]));
    }

    #[tokio::test]
    async fn test_diverging_endorser_blocks_submit() {
        let (network, controller) = controller();
        assert!(controller.deploy(deploy_request(), &NoProgress).await.success);
        network.set_diverging("peer0.org2", true);

        let result = controller.submit(&call("put", &["color", "blue"])).await;
        assert!(!result.success);
        assert_eq!(result.output["kind"], json!(ErrorKind::EndorsementDisagreement));
        assert_eq!(result.output["reason"], "content_mismatch");
        assert_eq!(network.snapshot().world_state("ch", "kv")["color"], "red");
    }

    #[tokio::test]
    async fn test_rejected_submit_is_not_a_disagreement() {
        let (network, controller) = controller();
        assert!(controller.deploy(deploy_request(), &NoProgress).await.success);

        let result = controller.submit(&call("transfer", &["a"])).await;
        assert!(!result.success);
        assert_eq!(result.output["kind"], json!(ErrorKind::PeerRejected));
        assert_eq!(result.output["reason"], "no_valid_endorsement");
        assert!(result.message.contains("Received unknown function transfer invocation"));
        assert_eq!(network.snapshot().committed.len(), 1);
    }

    #[tokio::test]
    async fn test_diverging_reader_reports_mismatch() {
        let (network, controller) = controller();
        assert!(controller.deploy(deploy_request(), &NoProgress).await.success);
        network.set_diverging("peer1.org1", true);

        let result = controller.evaluate(&call("get", &["color"])).await;
        assert!(!result.success);
        assert_eq!(result.output["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_function_rejected() {
        let (_network, controller) = controller();
        assert!(controller.deploy(deploy_request(), &NoProgress).await.success);

        let result = controller.evaluate(&call("transfer", &[])).await;
        assert!(!result.success);
        assert_eq!(result.output["kind"], json!(ErrorKind::PeerRejected));
        assert!(result.message.contains("Received unknown function transfer invocation"));
    }

    #[tokio::test]
    async fn test_channel_create_and_join() {
        let (network, controller) = controller();
        let envelope = json!({"channel": "ch", "config": {"orderer": "solo"}}).to_string();

        let created = controller
            .create_channel(&ChannelConfigRequest {
                channel: "ch".to_string(),
                envelope,
                organization: None,
            })
            .await;
        assert!(created.success, "{}", created.message);

        let joined = controller
            .join_channel(&ChannelJoinRequest {
                channel: "ch".to_string(),
                organization: Some("org2".to_string()),
            })
            .await;
        assert!(joined.success, "{}", joined.message);
        assert_eq!(network.snapshot().channels["ch"].members.len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_query_alias() {
        let (_network, controller) = controller();
        assert!(controller.deploy(deploy_request(), &NoProgress).await.success);

        let result = controller
            .dispatch(
                "query",
                json!({"unit": "kv", "channel": "ch", "function": "ping"}),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output, Value::String("pong".to_string()));
    }
}
