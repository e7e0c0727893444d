//! Container lifecycle: detect, remove, recreate and verify by exact name

use crate::account::AccountLayout;
use crate::context::ExecutionContext;
use crate::ports::PortBinding;
use crate::{Error, Result};
use command_executor::{Command, CommandBuilder, Executor, Launcher};
use provision_config::Settings;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Where a container stands in the recreate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// No container with the exact name exists
    Absent,
    /// A container with the exact name exists, in any state
    Stale,
    /// The stale container was force-removed
    Removed,
    /// The run call is being issued
    Starting,
    /// Inspection succeeded after the run call
    Running,
    /// The run call or the inspection failed
    Failed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerState::Absent => "absent",
            ContainerState::Stale => "stale",
            ContainerState::Removed => "removed",
            ContainerState::Starting => "starting",
            ContainerState::Running => "running",
            ContainerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything needed to issue the run call for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Exact container name
    pub name: String,
    /// Image to run
    pub image: String,
    /// Restart policy for the detached run
    pub restart_policy: String,
    /// Environment passed with `-e`
    pub env: Vec<(String, String)>,
    /// Published ports
    pub ports: Vec<PortBinding>,
    /// Host directory mounted into the container
    pub host_path: PathBuf,
    /// Mount point inside the container
    pub container_path: String,
}

impl ContainerSpec {
    /// The desired container for `layout`, derived from current inputs
    pub fn for_account(
        layout: &AccountLayout,
        settings: &Settings,
        context: &ExecutionContext,
        ports: Vec<PortBinding>,
    ) -> Self {
        let (uid, gid) = context.container_identity();
        let env = vec![
            ("ACCOUNT".to_string(), layout.account().to_string()),
            ("WSR_ENABLE".to_string(), "false".to_string()),
            ("WS_ENABLE".to_string(), "false".to_string()),
            ("HTTP_ENABLE".to_string(), "false".to_string()),
            ("NAPCAT_UID".to_string(), uid.to_string()),
            ("NAPCAT_GID".to_string(), gid.to_string()),
        ];

        Self {
            name: layout.container_name().to_string(),
            image: settings.runtime.image.clone(),
            restart_policy: settings.runtime.restart_policy.clone(),
            env,
            ports,
            host_path: layout.config_dir().to_path_buf(),
            container_path: settings.layout.container_data_path.clone(),
        }
    }

    /// The run invocation
    ///
    /// Detached runs get `-d` and the restart policy. The foreground form
    /// drops both and adds `--rm`, for reproducing a failed start by hand.
    pub fn run_command(&self, binary: &str, detached: bool) -> Command {
        let mut cmd = Command::builder(binary).arg("run");
        cmd = if detached { cmd.arg("-d") } else { cmd.arg("--rm") };
        cmd = cmd.args(["--name", self.name.as_str()]);

        for (key, value) in &self.env {
            cmd = cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        for binding in &self.ports {
            cmd = cmd.arg("-p").arg(binding.publish_arg());
        }
        cmd = cmd
            .arg("-v")
            .arg(format!("{}:{}", self.host_path.display(), self.container_path));

        if detached {
            cmd = cmd.args(["--restart", self.restart_policy.as_str()]);
        }
        cmd.arg(&self.image).build()
    }
}

/// Outcome of one recreate cycle
#[derive(Debug, Clone)]
pub struct LifecycleReport {
    /// Container the cycle acted on
    pub container_name: String,
    /// Every state entered, in order
    pub transitions: Vec<ContainerState>,
    /// Status string from the inspection, when it succeeded
    pub status: Option<String>,
    /// Why the cycle ended in `Failed`
    pub failure: Option<String>,
    /// Equivalent foreground invocation, for troubleshooting
    pub foreground_command: Command,
    /// Follow-up commands for the operator
    pub hints: Vec<Command>,
}

impl LifecycleReport {
    /// The last state entered
    pub fn final_state(&self) -> ContainerState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(ContainerState::Absent)
    }

    /// Whether the container ended up running
    pub fn is_running(&self) -> bool {
        self.final_state() == ContainerState::Running
    }
}

/// Drives the container runtime CLI for one container name at a time
pub struct ContainerLifecycleManager<L: Launcher> {
    executor: Executor<L>,
    binary: String,
}

impl<L: Launcher> ContainerLifecycleManager<L> {
    /// Create a manager issuing `binary` commands through `launcher`
    pub fn new(launcher: L, binary: impl Into<String>) -> Self {
        Self {
            executor: Executor::new("container-lifecycle", launcher),
            binary: binary.into(),
        }
    }

    fn runtime(&self) -> CommandBuilder {
        Command::builder(&self.binary)
    }

    /// `Stale` if a container named exactly `name` exists, else `Absent`
    pub async fn detect(&self, name: &str) -> Result<ContainerState> {
        let ps = self
            .runtime()
            .args(["ps", "-a", "--filter"])
            .arg(format!("name=^{}$", name))
            .args(["--format", "{{.Names}}"])
            .build();

        let result = self.executor.execute(ps).await?;
        if !result.success() {
            return Err(Error::runtime("listing", result.diagnostic()));
        }

        if result.output.lines().any(|line| line.trim() == name) {
            Ok(ContainerState::Stale)
        } else {
            Ok(ContainerState::Absent)
        }
    }

    /// Force-remove `name`
    pub async fn remove_stale(&self, name: &str) -> Result<()> {
        let rm = self.runtime().args(["rm", "-f", name]).build();
        let result = self.executor.execute(rm).await?;
        if !result.success() {
            return Err(Error::runtime("removal", result.diagnostic()));
        }
        info!("Removed stale container {}", name);
        Ok(())
    }

    /// Remove `name` if it exists; returns the states entered
    pub async fn cleanup_if_stale(&self, name: &str) -> Result<Vec<ContainerState>> {
        match self.detect(name).await? {
            ContainerState::Stale => {
                info!("Container {} already exists, it will be replaced", name);
                self.remove_stale(name).await?;
                Ok(vec![ContainerState::Stale, ContainerState::Removed])
            }
            state => Ok(vec![state]),
        }
    }

    /// Issue the detached run call; `Err(reason)` when it exits non-zero
    pub async fn start(&self, spec: &ContainerSpec) -> Result<std::result::Result<(), String>> {
        let result = self
            .executor
            .execute(spec.run_command(&self.binary, true))
            .await?;
        if result.success() {
            Ok(Ok(()))
        } else {
            Ok(Err(result.diagnostic().to_string()))
        }
    }

    /// Inspect `name`; `Ok(status)` on success, `Err(reason)` otherwise
    pub async fn verify(&self, name: &str) -> Result<std::result::Result<String, String>> {
        let inspect = self
            .runtime()
            .args(["inspect", "--format", "{{.State.Status}}", name])
            .build();
        let result = self.executor.execute(inspect).await?;
        if result.success() {
            Ok(Ok(result.output.trim().to_string()))
        } else {
            Ok(Err(result.diagnostic().to_string()))
        }
    }

    /// Replace any container of the same name with a fresh one and verify it
    ///
    /// `prior` holds the states entered by an earlier cleanup of the same
    /// name; they lead the report. Existence is checked again right before
    /// the run call. A started container is never rolled back, even when
    /// verification fails.
    pub async fn recreate(
        &self,
        spec: &ContainerSpec,
        prior: Vec<ContainerState>,
    ) -> Result<LifecycleReport> {
        let mut transitions = prior;
        let again = self.cleanup_if_stale(&spec.name).await?;
        if transitions.is_empty() || again.contains(&ContainerState::Stale) {
            transitions.extend(again);
        }
        transitions.push(ContainerState::Starting);
        info!("Starting container {}", spec.name);

        let mut status = None;
        let mut failure = None;
        match self.start(spec).await? {
            Err(reason) => {
                warn!("Run call for {} failed: {}", spec.name, reason);
                failure = Some(format!("run failed: {}", reason));
            }
            Ok(()) => match self.verify(&spec.name).await? {
                Ok(state) => status = Some(state),
                Err(reason) => {
                    warn!("Inspection of {} failed: {}", spec.name, reason);
                    failure = Some(format!("inspection failed: {}", reason));
                }
            },
        }

        let final_state = if failure.is_some() {
            ContainerState::Failed
        } else {
            ContainerState::Running
        };
        transitions.push(final_state);
        info!("Container {} is {}", spec.name, final_state);

        Ok(LifecycleReport {
            container_name: spec.name.clone(),
            transitions,
            status,
            failure,
            foreground_command: self
                .executor
                .effective_command(&spec.run_command(&self.binary, false)),
            hints: self.hints(&spec.name, final_state),
        })
    }

    fn hints(&self, name: &str, state: ContainerState) -> Vec<Command> {
        let commands = match state {
            ContainerState::Running => vec![
                self.runtime().args(["logs", "-f", name]).build(),
                self.runtime().args(["stop", name]).build(),
                self.runtime().args(["rm", "-f", name]).build(),
            ],
            _ => vec![
                self.runtime().args(["rm", "-f", name]).build(),
                self.runtime()
                    .args(["ps", "-a", "--filter"])
                    .arg(format!("name={}", name))
                    .build(),
            ],
        };
        commands
            .iter()
            .map(|cmd| self.executor.effective_command(cmd))
            .collect()
    }
}
