//! Ledger state of the simulated network and the built-in unit
//!
//! Every deployed unit runs the same key/value contract: `init`, `ping`,
//! `put`, `get`, `delete` and `list`. Execution is a pure function of the
//! call and the current world state; writes are only applied on commit.

use endorse_domain::endorsement::parse_best_effort;
use endorse_domain::endorsement::proposal::STATUS_SUCCESS;
use endorse_domain::{EndorsementPolicy, InstalledUnit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Status a peer reports when the unit itself fails.
pub const STATUS_UNIT_ERROR: u16 = 500;

/// A unit instantiated on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantiatedUnit {
    pub version: String,
    pub policy: EndorsementPolicy,
}

/// A created channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Hex digest of the current channel configuration
    pub config_digest: String,
    /// Organizations that signed the current configuration
    pub signers: Vec<String>,
    /// Peers that joined the channel
    pub members: BTreeSet<String>,
}

/// Everything the simulated network remembers, serializable as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    /// Installed units per peer name
    pub installed: BTreeMap<String, Vec<InstalledUnit>>,
    /// Instantiated units per channel, keyed by unit name
    pub instantiated: BTreeMap<String, BTreeMap<String, InstantiatedUnit>>,
    /// World state per `channel/unit`
    pub state: BTreeMap<String, BTreeMap<String, String>>,
    pub channels: BTreeMap<String, ChannelRecord>,
    /// Committed transaction ids in commit order
    pub committed: Vec<String>,
}

impl LedgerSnapshot {
    pub fn state_key(channel: &str, unit: &str) -> String {
        format!("{}/{}", channel, unit)
    }

    pub fn world_state(&self, channel: &str, unit: &str) -> BTreeMap<String, String> {
        self.state
            .get(&Self::state_key(channel, unit))
            .cloned()
            .unwrap_or_default()
    }

    pub fn instantiated_unit(&self, channel: &str, unit: &str) -> Option<&InstantiatedUnit> {
        self.instantiated.get(channel).and_then(|u| u.get(unit))
    }

    pub fn has_installed(&self, peer: &str, unit: &str, version: &str) -> bool {
        self.installed
            .get(peer)
            .is_some_and(|units| units.iter().any(|u| u.name == unit && u.version == version))
    }

    pub fn is_committed(&self, transaction_id: &str) -> bool {
        self.committed.iter().any(|id| id == transaction_id)
    }

    pub fn apply(&mut self, channel: &str, unit: &str, writes: &[StateWrite]) {
        let state = self
            .state
            .entry(Self::state_key(channel, unit))
            .or_default();
        for write in writes {
            match &write.value {
                Some(value) => {
                    state.insert(write.key.clone(), value.clone());
                }
                None => {
                    state.remove(&write.key);
                }
            }
        }
    }
}

/// One key written (or deleted, when `value` is `None`) by an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateWrite {
    pub key: String,
    pub value: Option<String>,
}

/// What changes when a proposal is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    Invoke,
    Instantiate {
        version: String,
        policy: EndorsementPolicy,
    },
}

/// Proposal carried inside a handle until commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub channel: String,
    pub unit: String,
    pub change: PendingChange,
    pub writes: Vec<StateWrite>,
}

/// Result of running one unit function on one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub status: u16,
    pub message: Option<String>,
    pub payload: Vec<u8>,
    pub writes: Vec<StateWrite>,
}

impl Execution {
    fn ok(payload: Vec<u8>, writes: Vec<StateWrite>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: None,
            payload,
            writes,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_UNIT_ERROR,
            message: Some(message.into()),
            payload: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Bytes a peer signs: the response payload plus the write set.
    pub fn endorsed_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "payload": String::from_utf8_lossy(&self.payload),
            "writes": self.writes,
        }))
        .unwrap_or_default()
    }
}

fn echo(args: &[String]) -> Vec<u8> {
    serde_json::to_vec(args).unwrap_or_default()
}

fn expect_args(function: &str, args: &[String], count: usize) -> Result<(), Execution> {
    if args.len() == count {
        Ok(())
    } else {
        Err(Execution::error(format!(
            "Incorrect number of arguments to {}. Expecting {}",
            function, count
        )))
    }
}

/// Run `function` of the key/value unit against `state`.
///
/// Functions without a natural result echo their arguments as a JSON array.
pub fn execute(function: &str, args: &[String], state: &BTreeMap<String, String>) -> Execution {
    let run = || -> Result<Execution, Execution> {
        match function {
            "init" => {
                if args.len() % 2 != 0 {
                    return Err(Execution::error(
                        "Incorrect number of arguments to init. Expecting key/value pairs",
                    ));
                }
                let writes = args
                    .chunks(2)
                    .map(|pair| StateWrite {
                        key: pair[0].clone(),
                        value: Some(pair[1].clone()),
                    })
                    .collect();
                Ok(Execution::ok(echo(args), writes))
            }
            "ping" => Ok(Execution::ok(b"pong".to_vec(), Vec::new())),
            "put" => {
                expect_args(function, args, 2)?;
                let write = StateWrite {
                    key: args[0].clone(),
                    value: Some(args[1].clone()),
                };
                Ok(Execution::ok(echo(args), vec![write]))
            }
            "get" => {
                expect_args(function, args, 1)?;
                state
                    .get(&args[0])
                    .map(|value| Execution::ok(value.clone().into_bytes(), Vec::new()))
                    .ok_or_else(|| Execution::error(format!("Key {} does not exist", args[0])))
            }
            "delete" => {
                expect_args(function, args, 1)?;
                if !state.contains_key(&args[0]) {
                    return Err(Execution::error(format!("Key {} does not exist", args[0])));
                }
                let write = StateWrite {
                    key: args[0].clone(),
                    value: None,
                };
                Ok(Execution::ok(echo(args), vec![write]))
            }
            "list" => {
                let records: Vec<serde_json::Value> = state
                    .iter()
                    .map(|(key, value)| {
                        let record = parse_best_effort(value.as_bytes());
                        serde_json::json!({"Key": key, "Record": record})
                    })
                    .collect();
                Ok(Execution::ok(
                    serde_json::to_vec(&records).unwrap_or_default(),
                    Vec::new(),
                ))
            }
            other => Err(Execution::error(format!(
                "Received unknown function {} invocation",
                other
            ))),
        }
    };

    run().unwrap_or_else(|failed| failed)
}
