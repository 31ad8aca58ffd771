//! Shared utilities for use cases.
//!
//! Per-call deadlines, transaction id generation and the diagnostic view of
//! peer results used by every use case.

use crate::ports::ledger_network::{LedgerNetwork, NetworkError};
use endorse_domain::transaction::NONCE_LEN;
use endorse_domain::{ProposalResult, TransactionId};
use rand::RngCore;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;

/// Run `call` under a deadline, reporting expiry as [`NetworkError::Timeout`].
pub(crate) async fn bounded<T, F>(
    deadline: Duration,
    what: &str,
    call: F,
) -> Result<T, NetworkError>
where
    F: Future<Output = Result<T, NetworkError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(NetworkError::Timeout(format!(
            "{} did not complete within {}s",
            what,
            deadline.as_secs_f64()
        ))),
    }
}

/// Fresh transaction id for one attempt, bound to the client's identity.
pub(crate) fn new_transaction_id(network: &dyn LedgerNetwork) -> TransactionId {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    TransactionId::from_nonce(&nonce, &network.creator())
}

/// Peer results rendered for callers: payloads as text, no signature bytes.
pub fn describe_results(results: &[ProposalResult]) -> Value {
    Value::Array(
        results
            .iter()
            .map(|r| {
                json!({
                    "peer": r.peer,
                    "organization": r.organization,
                    "status": r.status,
                    "message": r.message,
                    "payload": String::from_utf8_lossy(&r.payload),
                })
            })
            .collect(),
    )
}
