//! Output and audit configuration from TOML (`[output]`, `[audit]`)

use serde::{Deserialize, Serialize};

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Print results as JSON instead of text
    pub json: bool,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            color: true,
        }
    }
}

/// Raw audit configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    /// JSONL audit trail; auditing is off when unset
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_output_deserialize() {
        let toml_str = r#"
[output]
json = true

[audit]
path = "logs/audit.jsonl"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.output.json);
        assert!(config.output.color);
        assert_eq!(config.audit.path.as_deref(), Some("logs/audit.jsonl"));
    }
}
