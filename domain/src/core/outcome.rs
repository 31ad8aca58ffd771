//! Operation result value object

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result returned by every entry point to the request layer.
///
/// `output` carries the payload on success and the raw failing or
/// disagreeing results on failure, so callers can diagnose without logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub output: Value,
}

impl OperationResult {
    pub fn new(success: bool, message: impl Into<String>, output: Value) -> Self {
        Self {
            success,
            message: message.into(),
            output,
        }
    }

    pub fn ok(message: impl Into<String>, output: Value) -> Self {
        Self::new(true, message, output)
    }

    pub fn failed(message: impl Into<String>, output: Value) -> Self {
        Self::new(false, message, output)
    }

    /// Render peer bytes the way callers expect: UTF-8 text, lossily decoded.
    pub fn bytes_output(bytes: &[u8]) -> Value {
        Value::String(String::from_utf8_lossy(bytes).into_owned())
    }
}
