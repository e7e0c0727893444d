//! Configuration parser with environment variable substitution

use crate::{ConfigError, Result, Settings};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse the settings file if it exists, otherwise use the built-in defaults
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!(
            "No settings file at {}, using built-in defaults",
            path.display()
        );
        return Ok(Settings::default());
    }

    debug!("Loading settings from {}", path.display());
    parse_file(path)
}

/// Parse YAML configuration from a string
pub fn parse_str(content: &str) -> Result<Settings> {
    let substituted = substitute_env_vars(content)?;
    let settings: Settings = serde_yaml::from_str(&substituted)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Validate configuration
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected 1.0",
            settings.version
        )));
    }

    let required = [
        ("runtime.binary", &settings.runtime.binary),
        ("runtime.image", &settings.runtime.image),
        ("layout.name_prefix", &settings.layout.name_prefix),
        ("layout.container_data_path", &settings.layout.container_data_path),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} must not be empty",
                field
            )));
        }
    }

    if settings.layout.name_prefix.contains(['/', ' ']) {
        return Err(ConfigError::ValidationError(format!(
            "layout.name_prefix '{}' may not contain '/' or spaces",
            settings.layout.name_prefix
        )));
    }

    if settings.defaults.api_base_port == 0 || settings.defaults.console_port == 0 {
        return Err(ConfigError::ValidationError(
            "default ports must be in 1-65535".to_string(),
        ));
    }

    Ok(())
}

/// Substitute environment variables in a string
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let full_match = &cap[0];
        let var_expr = &cap[1];

        // Handle default values: ${VAR:-default}
        let (var_name, default_value) = match var_expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (var_expr, None),
        };

        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => {
                if let Some(default) = default_value {
                    result = result.replace(full_match, default);
                } else {
                    errors.push(var_name.to_string());
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}
