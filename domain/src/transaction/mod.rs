//! Transaction identity and call modes

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Private data passed alongside a proposal but never written to the ledger.
pub type TransientData = BTreeMap<String, Vec<u8>>;

/// Size of the random nonce mixed into every transaction id.
pub const NONCE_LEN: usize = 24;

/// Identifier shared by a proposal and its commit.
///
/// Derived as `hex(sha256(nonce ‖ creator))`. A fresh nonce is drawn for
/// every attempt, so ids are never reused across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn from_nonce(nonce: &[u8], creator: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(creator);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a pipeline run ends with an ordering-service commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Submit: propose, reconcile resiliently, commit
    Commit,
    /// Evaluate: propose, reconcile reads, no ordering service
    NoCommit,
}

impl PipelineMode {
    pub fn commits(&self) -> bool {
        matches!(self, PipelineMode::Commit)
    }
}

/// Which peers of an organization a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    /// One representative peer
    #[default]
    SinglePeer,
    /// Every peer the organization operates
    WholeOrganization,
}
