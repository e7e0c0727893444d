//! Sudo launcher for privilege escalation
//!
//! # Security Considerations and Limitations
//!
//! 1. **Password prompts**: sudo reads passwords from the controlling terminal, so
//!    an interactive operator can answer them. Unattended use requires NOPASSWD
//!    or cached credentials, otherwise commands will block.
//!
//! 2. **Privilege Escalation Visibility**: Commands executed through this launcher run with
//!    elevated privileges. [`Launcher::effective_command`] shows the real command line.
//!
//! 3. **Password in Command Line**: Never pass passwords as command arguments as they
//!    may be visible in process lists and logs.
//!
//! # Example
//!
//! ```no_run
//! use command_executor::{Command, Executor, LocalLauncher, SudoLauncher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Executor::new("privileged-task", SudoLauncher::new(LocalLauncher));
//!
//! // This will run: sudo systemctl restart docker
//! let cmd = Command::builder("systemctl")
//!     .arg("restart")
//!     .arg("docker")
//!     .build();
//!
//! let result = executor.execute(cmd).await?;
//! # Ok(())
//! # }
//! ```

use crate::{error::Result, launcher::Launcher, Command, ExitResult};
use async_trait::async_trait;

/// Launcher that wraps another launcher to execute commands with sudo
#[derive(Debug, Clone)]
pub struct SudoLauncher<L> {
    inner: L,
    enabled: bool,
}

impl<L> SudoLauncher<L> {
    /// Create a new sudo launcher wrapping the given launcher
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            enabled: true,
        }
    }

    /// Create a launcher that only adds the prefix when `enabled` is true
    ///
    /// Lets callers decide once (for example from the effective user id)
    /// without changing the launcher type.
    pub fn when(inner: L, enabled: bool) -> Self {
        Self { inner, enabled }
    }

    fn wrap(&self, command: &Command) -> Command {
        if !self.enabled {
            return command.clone();
        }

        let mut builder = Command::builder("sudo")
            // Preserve environment variables by default
            .arg("-E")
            .arg(command.get_program())
            .args(command.get_args());

        for (key, val) in command.get_envs() {
            builder = builder.env(key, val);
        }
        builder.build()
    }
}

#[async_trait]
impl<L> Launcher for SudoLauncher<L>
where
    L: Launcher,
{
    async fn execute(&self, command: Command) -> Result<ExitResult> {
        let wrapped = self.wrap(&command);

        if !self.enabled {
            return self.inner.execute(wrapped).await;
        }

        self.inner
            .execute(wrapped)
            .await
            .map_err(|e| e.with_layer_context("Sudo"))
    }

    fn effective_command(&self, command: &Command) -> Command {
        self.inner.effective_command(&self.wrap(command))
    }
}
