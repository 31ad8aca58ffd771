//! Call argument normalisation.
//!
//! Units receive their arguments as plain strings. Requests carry JSON
//! values, so structured arguments are flattened to their JSON text before
//! they reach a proposal.

use serde_json::Value;

/// Convert JSON request arguments into the string list a unit expects.
///
/// Strings pass through untouched; every other value (objects, numbers,
/// booleans, null) is serialised to its compact JSON text.
pub fn normalize_args(args: &[Value]) -> Vec<String> {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
