//! Output formatter trait

use endorse_domain::OperationResult;

/// Trait for formatting operation results
pub trait OutputFormatter {
    /// Human-readable rendering
    fn format(&self, result: &OperationResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &OperationResult) -> String;
}
