//! Launcher trait for executing commands in different contexts

use crate::command::Command;
use crate::error::Result;
use crate::process::ExitResult;
use async_trait::async_trait;
use std::sync::Arc;

/// A launcher that can execute commands in a specific context
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Execute a command and wait for it to complete, capturing output
    async fn execute(&self, command: Command) -> Result<ExitResult>;

    /// The command line this launcher actually runs for `command`
    ///
    /// Wrapping launchers rewrite the command (for example to add a `sudo`
    /// prefix); the default is the command unchanged.
    fn effective_command(&self, command: &Command) -> Command {
        command.clone()
    }
}

#[async_trait]
impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    async fn execute(&self, command: Command) -> Result<ExitResult> {
        (**self).execute(command).await
    }

    fn effective_command(&self, command: &Command) -> Command {
        (**self).effective_command(command)
    }
}
