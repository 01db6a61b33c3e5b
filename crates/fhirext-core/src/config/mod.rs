//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty configuration is valid.

pub mod host;
pub mod logging;
pub mod sample;

use serde::{Deserialize, Serialize};

use self::host::HostConfig;
use self::logging::LoggingConfig;
use self::sample::SampleConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Host engine settings passed to handlers.
    #[serde(default)]
    pub host: HostConfig,
    /// Settings of the bundled sample customization.
    #[serde(default)]
    pub sample: SampleConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `FHIREXT__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FHIREXT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.host.fhir_version, "R4");
        assert_eq!(config.sample.hidden_resources, vec!["Account".to_string()]);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [logging]
            format = "pretty"

            [host]
            endpoint = "/fhir/r5"
            fhir_version = "R5"

            [sample]
            max_transaction_entries = 10
            "#,
        )
        .expect("valid config");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.host.endpoint, "/fhir/r5");
        assert_eq!(config.sample.max_transaction_entries, 10);
        assert_eq!(config.host.request_timeout_seconds, 30);
    }
}
