//! Per-account configuration bundle
//!
//! Two JSON documents are written into the account's config directory, each
//! under a stable name and an account-suffixed name. All four files are
//! staged as temporary files first and only renamed into place once every
//! one of them was written.

use crate::account::AccountLayout;
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Used when the reconnect interval answer is not a non-negative integer
pub const FALLBACK_RECONNECT_INTERVAL_MS: u64 = 1200;
/// Heartbeat of the outbound websocket client
pub const HEARTBEAT_INTERVAL_MS: u64 = 30000;

const ENGINE_FILE: &str = "napcat";
const BRIDGE_FILE: &str = "onebot11";

#[cfg(unix)]
const DIR_MODE: u32 = 0o777;
#[cfg(unix)]
const FILE_MODE: u32 = 0o666;

/// Engine-level settings; constant for every account
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    file_log: bool,
    console_log: bool,
    file_log_level: String,
    console_log_level: String,
    packet_backend: String,
    packet_server: String,
    o3_hook_mode: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            file_log: false,
            console_log: true,
            file_log_level: "debug".to_string(),
            console_log_level: "info".to_string(),
            packet_backend: "auto".to_string(),
            packet_server: String::new(),
            o3_hook_mode: 1,
        }
    }
}

/// One outbound websocket client of the bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsocketClient {
    enable: bool,
    name: String,
    url: String,
    report_self_message: bool,
    message_post_format: String,
    token: String,
    debug: bool,
    heart_interval: u64,
    reconnect_interval: u64,
}

/// Transport section of the bridge settings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    http_servers: Vec<serde_json::Value>,
    http_sse_servers: Vec<serde_json::Value>,
    http_clients: Vec<serde_json::Value>,
    websocket_servers: Vec<serde_json::Value>,
    websocket_clients: Vec<WebsocketClient>,
    plugins: Vec<serde_json::Value>,
}

/// Bridge-level settings with exactly one outbound websocket client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSettings {
    network: NetworkSettings,
    music_sign_url: String,
    enable_local_file2_url: bool,
    parse_mult_msg: bool,
}

impl BridgeSettings {
    /// Settings connecting out to `client`
    pub fn for_client(client: &BridgeClient) -> Self {
        Self {
            network: NetworkSettings {
                http_servers: Vec::new(),
                http_sse_servers: Vec::new(),
                http_clients: Vec::new(),
                websocket_servers: Vec::new(),
                websocket_clients: vec![WebsocketClient {
                    enable: true,
                    name: client.name.clone(),
                    url: client.url.clone(),
                    report_self_message: false,
                    message_post_format: "array".to_string(),
                    token: String::new(),
                    debug: false,
                    heart_interval: HEARTBEAT_INTERVAL_MS,
                    reconnect_interval: client.reconnect_interval_ms,
                }],
                plugins: Vec::new(),
            },
            music_sign_url: String::new(),
            enable_local_file2_url: false,
            parse_mult_msg: false,
        }
    }
}

/// The bot framework endpoint the bridge connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeClient {
    /// Client name
    pub name: String,
    /// Websocket URL
    pub url: String,
    /// Reconnect interval in milliseconds
    pub reconnect_interval_ms: u64,
}

impl BridgeClient {
    /// Build a client from raw operator answers
    pub fn new(name: impl Into<String>, url: impl Into<String>, reconnect_interval: &str) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            reconnect_interval_ms: parse_reconnect_interval(reconnect_interval),
        }
    }
}

/// Parse a reconnect interval, falling back to 1200 ms on bad input
pub fn parse_reconnect_interval(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(ms) => ms,
        Err(_) => {
            warn!(
                "Reconnect interval '{}' is not a non-negative integer, using {} ms",
                raw.trim(),
                FALLBACK_RECONNECT_INTERVAL_MS
            );
            FALLBACK_RECONNECT_INTERVAL_MS
        }
    }
}

/// Files written for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    /// Directory mounted into the container
    pub config_dir: PathBuf,
    /// Every file written, stable names first
    pub files: Vec<PathBuf>,
}

/// Writes configuration bundles into account directories
#[derive(Debug, Clone, Default)]
pub struct ConfigBundler {
    engine: EngineSettings,
}

impl ConfigBundler {
    /// Create a bundler with the constant engine settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Write both documents under their stable and suffixed names
    ///
    /// Existing files are overwritten.
    pub fn write(&self, layout: &AccountLayout, client: &BridgeClient) -> Result<WrittenBundle> {
        let config_dir = layout.config_dir();
        for dir in [layout.account_dir(), config_dir] {
            std::fs::create_dir_all(dir).map_err(|e| bundle_error(dir, e))?;
            set_mode(dir, DirOrFile::Dir)?;
        }

        let engine = serde_json::to_vec_pretty(&self.engine)?;
        let bridge = serde_json::to_vec_pretty(&BridgeSettings::for_client(client))?;
        let account = layout.account().as_str();

        let targets = [
            (format!("{}.json", ENGINE_FILE), &engine),
            (format!("{}_{}.json", ENGINE_FILE, account), &engine),
            (format!("{}.json", BRIDGE_FILE), &bridge),
            (format!("{}_{}.json", BRIDGE_FILE, account), &bridge),
        ];

        let mut staged = Vec::with_capacity(targets.len());
        for (name, content) in &targets {
            let target = config_dir.join(name);
            staged.push((stage(config_dir, content)?, target));
        }

        let mut files = Vec::with_capacity(staged.len());
        for (temp, target) in staged {
            temp.persist(&target)
                .map_err(|e| bundle_error(&target, e.error))?;
            info!("Wrote {}", target.display());
            files.push(target);
        }

        Ok(WrittenBundle {
            config_dir: config_dir.to_path_buf(),
            files,
        })
    }
}

fn stage(dir: &Path, content: &[u8]) -> Result<NamedTempFile> {
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| bundle_error(dir, e))?;
    temp.write_all(content)
        .and_then(|_| temp.flush())
        .map_err(|e| bundle_error(temp.path(), e))?;
    set_mode(temp.path(), DirOrFile::File)?;
    Ok(temp)
}

enum DirOrFile {
    Dir,
    File,
}

#[cfg(unix)]
fn set_mode(path: &Path, kind: DirOrFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match kind {
        DirOrFile::Dir => DIR_MODE,
        DirOrFile::File => FILE_MODE,
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| bundle_error(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _kind: DirOrFile) -> Result<()> {
    Ok(())
}

fn bundle_error(path: &Path, source: std::io::Error) -> Error {
    Error::Bundle {
        path: path.to_path_buf(),
        source,
    }
}
