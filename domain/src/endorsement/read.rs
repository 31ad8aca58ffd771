//! Read-agreement check for read-only calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of comparing read responses from several peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadAgreement {
    pub all_agree: bool,
    /// Common value when all agree, otherwise the first mismatching value
    pub value: Value,
}

/// Compare raw read payloads pairwise in sequence order.
///
/// Stops at the first mismatch and reports the value that broke agreement.
/// The reported value goes through [`parse_best_effort`].
///
/// # Example
///
/// ```
/// use endorse_domain::endorsement::reconcile_reads;
/// use serde_json::json;
///
/// let split = reconcile_reads(&[b"A".to_vec(), b"A".to_vec(), b"B".to_vec()]);
/// assert!(!split.all_agree);
/// assert_eq!(split.value, json!("B"));
///
/// let agreed = reconcile_reads(&[b"A".to_vec(), b"A".to_vec(), b"A".to_vec()]);
/// assert!(agreed.all_agree);
/// assert_eq!(agreed.value, json!("A"));
/// ```
pub fn reconcile_reads(responses: &[Vec<u8>]) -> ReadAgreement {
    let Some(first) = responses.first() else {
        return ReadAgreement {
            all_agree: false,
            value: Value::Null,
        };
    };

    for pair in responses.windows(2) {
        if pair[0] != pair[1] {
            return ReadAgreement {
                all_agree: false,
                value: parse_best_effort(&pair[1]),
            };
        }
    }

    ReadAgreement {
        all_agree: true,
        value: parse_best_effort(first),
    }
}

/// Parse bytes as JSON, falling back to the raw text when they are not JSON.
pub fn parse_best_effort(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
