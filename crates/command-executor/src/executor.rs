//! Main executor type that wraps a launcher

use crate::command::Command;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::process::ExitResult;
use tracing::debug;

/// An executor that runs commands via a specific launcher
pub struct Executor<L: Launcher> {
    /// The name used to identify this executor in logs
    service_name: String,
    /// The launcher implementation
    launcher: L,
}

impl<L: Launcher> Executor<L> {
    /// Create a new executor with the given launcher
    pub fn new(service_name: impl Into<String>, launcher: L) -> Self {
        Self {
            service_name: service_name.into(),
            launcher,
        }
    }

    /// Execute a command and wait for it to complete
    pub async fn execute(&self, command: Command) -> Result<ExitResult> {
        debug!(
            "[{}] executing: {}",
            self.service_name,
            self.launcher.effective_command(&command)
        );
        let result = self.launcher.execute(command).await?;
        debug!(
            "[{}] exit code {:?}",
            self.service_name, result.status.code
        );
        Ok(result)
    }

    /// The command line the launcher would run for `command`
    pub fn effective_command(&self, command: &Command) -> Command {
        self.launcher.effective_command(command)
    }
}
