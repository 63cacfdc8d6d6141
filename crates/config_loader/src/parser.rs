//! Configuration parsing
//!
//! Supports TOML (primary) and JSON (optional) formats.

use contracts::{CircuitError, HostBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML configuration
pub fn parse_toml(content: &str) -> Result<HostBlueprint, CircuitError> {
    toml::from_str(content).map_err(|e| CircuitError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON configuration
pub fn parse_json(content: &str) -> Result<HostBlueprint, CircuitError> {
    serde_json::from_str(content).map_err(|e| CircuitError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse using the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<HostBlueprint, CircuitError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[circuit]
max_pending_batches = 5
mailbox_capacity = 32
disconnect_grace_secs = 120
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let blueprint = result.unwrap();
        assert_eq!(blueprint.circuit.max_pending_batches, 5);
        assert_eq!(blueprint.circuit.disconnect_grace_secs, 120);
        assert_eq!(blueprint.metrics_port, None);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let blueprint = parse_toml("").unwrap();
        assert_eq!(blueprint.circuit.max_pending_batches, 10);
    }

    #[test]
    fn test_parse_json() {
        let content = r#"{"circuit": {"max_pending_batches": 2}, "metrics_port": 9100}"#;
        let blueprint = parse_json(content).unwrap();
        assert_eq!(blueprint.circuit.max_pending_batches, 2);
        assert_eq!(blueprint.metrics_port, Some(9100));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_toml("circuit = not-a-table");
        assert!(matches!(result, Err(CircuitError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
