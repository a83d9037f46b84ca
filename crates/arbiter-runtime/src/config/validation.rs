//! Configuration validation utilities.
//!
//! Level and format names are checked by deserialization already; this covers
//! the combinations serde cannot see.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ArbiterConfig, EngineConfig, LogFormat, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ArbiterConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_engine_config(&config.engine)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is \"file\" but logging.file_path is not set",
        ));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format \"json\" requires the json-log feature",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter target: {target:?}"
        )));
    }

    Ok(())
}

fn validate_engine_config(engine: &EngineConfig) -> ConfigResult<()> {
    if engine
        .name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(ConfigError::validation("engine.name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ArbiterConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = ArbiterConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("logs/arbiter.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mut config = ArbiterConfig::default();
        config.engine.name = Some("  ".into());
        assert!(validate_config(&config).is_err());

        let mut config = ArbiterConfig::default();
        config.logging.filters.insert(String::new(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }

    #[cfg(not(feature = "json-log"))]
    #[test]
    fn test_json_needs_feature() {
        let mut config = ArbiterConfig::default();
        config.logging.format = LogFormat::Json;
        assert!(validate_config(&config).is_err());
    }
}
