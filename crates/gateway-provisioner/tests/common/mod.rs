//! Fake host for provisioning scenarios
//!
//! `FakeHost` answers runtime, socket-table and presence-check commands from
//! shared in-memory state, so a whole session can run without docker.

#![allow(dead_code)]

use async_trait::async_trait;
use command_executor::testing::ScriptedLauncher;
use command_executor::{Command, ExitResult};
use gateway_provisioner::{
    ExecutionContext, HostInfo, InputProvider, ProvisioningSession, RuntimeInstaller,
    ScriptedInput,
};
use provision_config::Settings;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

pub const UBUNTU_OS_RELEASE: &str = "ID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"22.04\"\n";

/// What the fake host currently looks like
#[derive(Debug, Default)]
pub struct HostState {
    /// Container name to the host ports it publishes
    pub containers: BTreeMap<String, Vec<u16>>,
    /// Ports bound by processes other than containers
    pub listening: BTreeSet<u16>,
    /// Tools `command -v` finds
    pub tools: BTreeSet<String>,
    /// Containers whose inspection reports not-found
    pub failing_inspect: BTreeSet<String>,
    /// Number of installer runs
    pub installs: usize,
}

impl HostState {
    fn socket_table(&self) -> String {
        let mut out = String::from(
            "Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process\n",
        );
        let published = self.containers.values().flatten();
        for port in self.listening.iter().chain(published) {
            out.push_str(&format!("tcp   LISTEN 0      4096   0.0.0.0:{port} 0.0.0.0:*\n"));
        }
        out
    }
}

fn respond(state: &Mutex<HostState>, cmd: &Command) -> command_executor::Result<ExitResult> {
    let mut state = state.lock().unwrap();
    let argv = cmd.argv();
    let argv: Vec<&str> = match argv.first().map(String::as_str) {
        Some("sudo") => argv[2..].iter().map(String::as_str).collect(),
        _ => argv.iter().map(String::as_str).collect(),
    };

    let result = match argv.as_slice() {
        ["sh", "-c", _, "sh", tool] => {
            if state.tools.contains(*tool) {
                ExitResult::ok(format!("/usr/bin/{tool}\n"))
            } else {
                ExitResult::failed(1, "")
            }
        }
        ["ss", "-tuln"] => ExitResult::ok(state.socket_table()),
        ["docker", "ps", "-a", "--filter", filter, ..] => {
            let name = filter.trim_start_matches("name=^").trim_end_matches('$');
            if state.containers.contains_key(name) {
                ExitResult::ok(format!("{name}\n"))
            } else {
                ExitResult::ok("")
            }
        }
        ["docker", "rm", "-f", name] => {
            state.containers.remove(*name);
            ExitResult::ok(format!("{name}\n"))
        }
        ["docker", "run", "-d", rest @ ..] => {
            let name = rest[1].to_string();
            if state.containers.contains_key(&name) {
                return Ok(ExitResult::failed(125, "Conflict. The container name is already in use"));
            }
            let ports = rest
                .windows(2)
                .filter(|pair| pair[0] == "-p")
                .filter_map(|pair| pair[1].split(':').next()?.parse().ok())
                .collect();
            state.containers.insert(name, ports);
            ExitResult::ok("4f9a1c2b7d3e\n")
        }
        ["docker", "inspect", "--format", _, name] => {
            if state.failing_inspect.contains(*name) || !state.containers.contains_key(*name) {
                ExitResult::failed(1, format!("Error: No such object: {name}"))
            } else {
                ExitResult::ok("running\n")
            }
        }
        other => panic!("unexpected command: {other:?}"),
    };
    Ok(result)
}

/// Installer that makes `docker` appear on the fake host
pub struct FakeInstaller {
    state: Arc<Mutex<HostState>>,
}

#[async_trait]
impl RuntimeInstaller for FakeInstaller {
    async fn install(&self, _host: &HostInfo) -> gateway_provisioner::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.installs += 1;
        state.tools.insert("docker".to_string());
        Ok(())
    }
}

/// A temporary base directory plus a fake runtime
pub struct FakeHost {
    pub dir: TempDir,
    pub state: Arc<Mutex<HostState>>,
    pub launcher: Arc<ScriptedLauncher>,
    pub settings: Settings,
}

impl FakeHost {
    /// A Debian-family host with docker and ss installed
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let os_release = dir.path().join("os-release");
        std::fs::write(&os_release, UBUNTU_OS_RELEASE).unwrap();

        let state = Arc::new(Mutex::new(HostState {
            tools: ["docker", "ss"].iter().map(|t| t.to_string()).collect(),
            ..HostState::default()
        }));
        let shared = state.clone();
        let launcher = Arc::new(ScriptedLauncher::new(move |cmd| respond(&shared, cmd)));

        let mut settings = Settings::default();
        settings.layout.base_dir = dir.path().join("accounts");
        settings.host.os_release = os_release;

        Self {
            dir,
            state,
            launcher,
            settings,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    pub fn config_dir(&self, account: &str) -> PathBuf {
        self.settings
            .layout
            .base_dir
            .join(format!("napcat_{account}"))
            .join("config")
    }

    pub fn read_json(&self, account: &str, file: &str) -> serde_json::Value {
        let path = self.config_dir(account).join(file);
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.launcher.command_lines()
    }

    /// A session for an unprivileged operator that needs no sudo
    pub fn session<'a>(
        &self,
        input: &'a mut ScriptedInput,
    ) -> ProvisioningSession<Arc<ScriptedLauncher>, &'a mut ScriptedInput> {
        self.session_with(input, ExecutionContext::new(1000, 1000, false, false))
    }

    pub fn session_with<I: InputProvider>(
        &self,
        input: I,
        context: ExecutionContext,
    ) -> ProvisioningSession<Arc<ScriptedLauncher>, I> {
        ProvisioningSession::new(
            self.settings.clone(),
            context,
            self.launcher.clone(),
            input,
            Box::new(FakeInstaller {
                state: self.state.clone(),
            }),
        )
    }
}

/// Answers for one account that accept every default
pub fn default_answers(account: &str) -> Vec<String> {
    answers(account, "", "", "", "", "")
}

/// Answers for one account: id, client, url, reconnect, api port, webui port
pub fn answers(
    account: &str,
    client: &str,
    url: &str,
    reconnect: &str,
    api: &str,
    webui: &str,
) -> Vec<String> {
    [account, client, url, reconnect, api, webui]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn has_file(dir: &Path, name: &str) -> bool {
    dir.join(name).is_file()
}
