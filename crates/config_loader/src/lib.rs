//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `HostBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("max pending: {}", blueprint.circuit.max_pending_batches);
//! ```

mod parser;
mod validator;

pub use contracts::HostBlueprint;
pub use parser::ConfigFormat;

use contracts::CircuitError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<HostBlueprint, CircuitError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<HostBlueprint, CircuitError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize a HostBlueprint to a TOML string
    pub fn to_toml(blueprint: &HostBlueprint) -> Result<String, CircuitError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| CircuitError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a HostBlueprint to a JSON string
    pub fn to_json(blueprint: &HostBlueprint) -> Result<String, CircuitError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| CircuitError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, CircuitError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            CircuitError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| CircuitError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, CircuitError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
metrics_port = 9000

[circuit]
max_pending_batches = 3
mailbox_capacity = 32
disconnect_grace_secs = 60
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.circuit.max_pending_batches, 3);
        assert_eq!(bp.metrics_port, Some(9000));
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.circuit.max_pending_batches, bp2.circuit.max_pending_batches);
        assert_eq!(bp.metrics_port, bp2.metrics_port);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.circuit.disconnect_grace_secs, bp2.circuit.disconnect_grace_secs);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[circuit]
max_pending_batches = 0
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(CircuitError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = ConfigLoader::load_from_path(Path::new("config.yaml"));
        assert!(matches!(result, Err(CircuitError::ConfigParse { .. })));
    }
}
