//! Dependency verification and container runtime installation

use crate::host::{HostInfo, OsFamily};
use crate::{Error, Result};
use async_trait::async_trait;
use command_executor::{Command, Executor, Launcher};
use tracing::{info, warn};

/// Installs and enables the container runtime on a host
#[async_trait]
pub trait RuntimeInstaller: Send + Sync {
    /// Install the runtime, enable its service and configure registry mirrors
    ///
    /// Must be safe to call on a host where the runtime is already present.
    async fn install(&self, host: &HostInfo) -> Result<()>;
}

/// Installs the runtime with the distribution's package manager
pub struct PackageManagerInstaller<L: Launcher> {
    executor: Executor<L>,
    registry_mirrors: Vec<String>,
}

const DOCKER_CE_REPO: &str = "https://download.docker.com/linux/centos/docker-ce.repo";
const DAEMON_CONFIG: &str = "/etc/docker/daemon.json";

impl<L: Launcher> PackageManagerInstaller<L> {
    /// Create an installer; `launcher` should already carry the privilege prefix
    pub fn new(launcher: L, registry_mirrors: Vec<String>) -> Self {
        Self {
            executor: Executor::new("runtime-installer", launcher),
            registry_mirrors,
        }
    }

    /// The ordered steps for `host`
    pub async fn plan(&self, host: &HostInfo) -> Result<Vec<Command>> {
        let mut steps = match &host.os_family {
            OsFamily::Debian => vec![
                Command::builder("apt-get").arg("update").build(),
                Command::builder("apt-get")
                    .args(["install", "-y", "docker.io"])
                    .env("DEBIAN_FRONTEND", "noninteractive")
                    .build(),
            ],
            OsFamily::RedHat => {
                let (manager, plugins) = if self.has_command("dnf").await? {
                    ("dnf", "dnf-plugins-core")
                } else {
                    ("yum", "yum-utils")
                };
                let add_repo = if manager == "dnf" {
                    Command::builder("dnf")
                        .args(["config-manager", "--add-repo", DOCKER_CE_REPO])
                        .build()
                } else {
                    Command::builder("yum-config-manager")
                        .args(["--add-repo", DOCKER_CE_REPO])
                        .build()
                };
                vec![
                    Command::builder(manager).args(["install", "-y", plugins]).build(),
                    add_repo,
                    Command::builder(manager)
                        .args(["install", "-y", "docker-ce", "docker-ce-cli", "containerd.io"])
                        .build(),
                ]
            }
            OsFamily::Other(distro) => {
                return Err(Error::UnsupportedDistro {
                    distro: distro.clone(),
                });
            }
        };

        steps.push(
            Command::builder("systemctl")
                .args(["enable", "--now", "docker"])
                .build(),
        );

        if !self.registry_mirrors.is_empty() {
            let daemon_config = serde_json::to_string(&serde_json::json!({
                "registry-mirrors": self.registry_mirrors,
            }))?;
            steps.push(Command::builder("mkdir").args(["-p", "/etc/docker"]).build());
            steps.push(
                Command::builder("sh")
                    .arg("-c")
                    .arg(format!("printf '%s\\n' \"$1\" > {}", DAEMON_CONFIG))
                    .args(["sh", daemon_config.as_str()])
                    .build(),
            );
            steps.push(
                Command::builder("systemctl")
                    .args(["restart", "docker"])
                    .build(),
            );
        }

        Ok(steps)
    }

    async fn has_command(&self, name: &str) -> Result<bool> {
        let result = self.executor.execute(presence_check(name)).await?;
        Ok(result.success())
    }
}

#[async_trait]
impl<L: Launcher> RuntimeInstaller for PackageManagerInstaller<L> {
    async fn install(&self, host: &HostInfo) -> Result<()> {
        info!(
            "Installing container runtime for {} {}",
            host.distro_id, host.version
        );

        for step in self.plan(host).await? {
            let line = self.executor.effective_command(&step).to_string();
            info!("Running installation step: {}", line);

            let result = self.executor.execute(step).await?;
            if !result.success() {
                return Err(Error::InstallFailed {
                    step: line,
                    reason: result.diagnostic().to_string(),
                });
            }
        }

        info!("Container runtime installed");
        Ok(())
    }
}

/// Remediation hint for a missing auxiliary tool
pub fn remediation_hint(tool: &str) -> String {
    match tool {
        "ss" => "install the iproute2 package (apt-get install iproute2 / dnf install iproute)"
            .to_string(),
        "sudo" => "install sudo or run the provisioner as root".to_string(),
        other => format!("install '{}' with your package manager", other),
    }
}

fn presence_check(tool: &str) -> Command {
    Command::builder("sh")
        .args(["-c", "command -v \"$1\"", "sh", tool])
        .build()
}

/// Confirms the runtime and auxiliary CLIs exist
pub struct DependencyVerifier<'a, L: Launcher> {
    executor: Executor<L>,
    installer: &'a dyn RuntimeInstaller,
    runtime_binary: String,
}

impl<'a, L: Launcher> DependencyVerifier<'a, L> {
    /// Create a verifier; `runtime_binary` is the only tool it may install
    pub fn new(
        launcher: L,
        installer: &'a dyn RuntimeInstaller,
        runtime_binary: impl Into<String>,
    ) -> Self {
        Self {
            executor: Executor::new("dependency-verifier", launcher),
            installer,
            runtime_binary: runtime_binary.into(),
        }
    }

    /// Whether `tool` resolves on the PATH
    pub async fn is_present(&self, tool: &str) -> Result<bool> {
        let result = self.executor.execute(presence_check(tool)).await?;
        Ok(result.success())
    }

    /// Check every tool, installing the runtime if it is the one missing
    pub async fn verify(&self, host: &HostInfo, required_tools: &[String]) -> Result<()> {
        for tool in required_tools {
            if self.is_present(tool).await? {
                continue;
            }

            if *tool != self.runtime_binary {
                return Err(Error::MissingTool {
                    tool: tool.clone(),
                    hint: remediation_hint(tool),
                });
            }

            warn!("Container runtime '{}' not found, installing it", tool);
            self.installer.install(host).await?;

            if !self.is_present(tool).await? {
                return Err(Error::MissingTool {
                    tool: tool.clone(),
                    hint: "the runtime installer finished but the binary is still not on PATH"
                        .to_string(),
                });
            }
        }

        info!("All required tools present: {}", required_tools.join(", "));
        Ok(())
    }
}
