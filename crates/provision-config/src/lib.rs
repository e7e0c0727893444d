//! # Provision Configuration
//!
//! YAML settings for the gateway provisioner.
//!
//! Every field has a built-in default, so the settings file is optional and
//! may override any subset of sections. String values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod parser;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Configuration version
    #[serde(default = "default_version")]
    pub version: String,

    /// Container runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Filesystem layout and container naming
    #[serde(default)]
    pub layout: LayoutSettings,

    /// Host inspection settings
    #[serde(default)]
    pub host: HostSettings,

    /// Default answers offered at the interactive prompts
    #[serde(default)]
    pub defaults: PromptDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            runtime: RuntimeSettings::default(),
            layout: LayoutSettings::default(),
            host: HostSettings::default(),
            defaults: PromptDefaults::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Whether runtime and installer commands run behind `sudo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeMode {
    /// Use `sudo` only when the provisioner is not already running as root
    #[default]
    Auto,
    /// Always prefix with `sudo`
    Sudo,
    /// Never prefix
    None,
}

/// Container runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Runtime CLI binary
    pub binary: String,
    /// Gateway image to run
    pub image: String,
    /// Restart policy passed to `run`
    pub restart_policy: String,
    /// Privilege escalation policy
    pub privilege: PrivilegeMode,
    /// Registry mirrors configured by the runtime installer
    pub registry_mirrors: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            image: "mlikiowa/napcat-docker:latest".to_string(),
            restart_policy: "always".to_string(),
            privilege: PrivilegeMode::Auto,
            registry_mirrors: Vec::new(),
        }
    }
}

/// Filesystem layout and container naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Directory holding one subdirectory per account
    pub base_dir: PathBuf,
    /// Prefix for container and account directory names
    pub name_prefix: String,
    /// Path inside the container where the account config directory is mounted
    pub container_data_path: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            base_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("napcat"),
            name_prefix: "napcat".to_string(),
            container_data_path: "/app/napcat/config".to_string(),
        }
    }
}

/// Host inspection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Host identification file
    pub os_release: PathBuf,
    /// Auxiliary CLIs that must exist besides the runtime binary
    pub required_tools: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            os_release: PathBuf::from("/etc/os-release"),
            required_tools: vec!["ss".to_string()],
        }
    }
}

/// Default answers offered at the interactive prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptDefaults {
    /// Outbound websocket client name
    pub client_name: String,
    /// Outbound websocket URL
    pub ws_url: String,
    /// Reconnect interval in milliseconds
    pub reconnect_interval_ms: u64,
    /// Base of the default API port; the account id length is added to it
    pub api_base_port: u16,
    /// Default web console port
    pub console_port: u16,
}

impl Default for PromptDefaults {
    fn default() -> Self {
        Self {
            client_name: "nonebot".to_string(),
            ws_url: "ws://127.0.0.1:8080/onebot/v11/ws".to_string(),
            reconnect_interval_ms: 1200,
            api_base_port: 3001,
            console_port: 6099,
        }
    }
}
