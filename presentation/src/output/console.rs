//! Console output formatter for operation results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use endorse_domain::OperationResult;
use serde_json::Value;

/// Longest value rendered inline before it is cut.
const MAX_VALUE_LEN: usize = 400;

/// Formats operation results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Status line followed by the output, one field per line for objects.
    pub fn format(result: &OperationResult) -> String {
        let mut output = String::new();

        let status = if result.success {
            "ok".green().bold()
        } else {
            "failed".red().bold()
        };
        output.push_str(&format!("{} {}\n", status, result.message));

        match &result.output {
            Value::Null => {}
            Value::Object(fields) => {
                for (key, value) in fields {
                    output.push_str(&format!(
                        "  {} {}\n",
                        format!("{}:", key).cyan(),
                        Self::indent_tail(&Self::render_value(value), "    ")
                    ));
                }
            }
            value => {
                output.push_str(&Self::indent(&Self::render_value(value), "  "));
                output.push('\n');
            }
        }

        output
    }

    /// Turn terminal colors off (or force them on) for every formatter.
    pub fn set_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    /// Format as JSON
    pub fn format_json(result: &OperationResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Strings print raw; everything else as pretty JSON, shortened if long.
    pub fn render_value(value: &Value) -> String {
        let text = match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_default(),
        };
        shorten(&text, MAX_VALUE_LEN)
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn indent_tail(text: &str, prefix: &str) -> String {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default().to_string();
        lines.fold(first, |acc, line| format!("{}\n{}{}", acc, prefix, line))
    }
}

/// Cut `text` to at most `max_len` bytes on a char boundary, marking the cut with `...`.
fn shorten(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let budget = max_len.saturating_sub(3);
    let end = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}...", &text[..end])
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &OperationResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &OperationResult) -> String {
        Self::format_json(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() {
        ConsoleFormatter::set_color(false);
    }

    #[test]
    fn test_format_success_with_string_output() {
        plain();
        let result = OperationResult::ok("Query successful", json!("pong"));
        assert_eq!(ConsoleFormatter::format(&result), "ok Query successful\n  pong\n");
    }

    #[test]
    fn test_format_failure_with_fields() {
        plain();
        let result = OperationResult::failed(
            "Peers disagree",
            json!({"kind": "disagreement", "value": "a"}),
        );
        let text = ConsoleFormatter::format(&result);
        assert!(text.starts_with("failed Peers disagree\n"));
        assert!(text.contains("  kind: disagreement\n"));
        assert!(text.contains("  value: a\n"));
    }

    #[test]
    fn test_format_null_output() {
        plain();
        let result = OperationResult::ok("done", Value::Null);
        assert_eq!(ConsoleFormatter::format(&result), "ok done\n");
    }

    #[test]
    fn test_long_values_are_cut() {
        let rendered = ConsoleFormatter::render_value(&json!("x".repeat(1000)));
        assert_eq!(rendered.len(), MAX_VALUE_LEN);
        assert!(rendered.ends_with("..."));
    }

    #[test]
    fn test_shorten_keeps_char_boundaries() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("payload-bytes", 10), "payload...");
        // 'é' is two bytes; the cut may not split it
        assert_eq!(shorten("ééééé", 8), "éé...");
    }

    #[test]
    fn test_format_json_shape() {
        let result = OperationResult::ok("done", json!({"k": 1}));
        let parsed: Value =
            serde_json::from_str(&ConsoleFormatter::format_json(&result)).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["output"]["k"], 1);
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
        assert_eq!(ConsoleFormatter::indent_tail("a\nb", "  "), "a\n  b");
    }
}
