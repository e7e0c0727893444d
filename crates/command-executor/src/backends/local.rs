//! Local process execution backend

use async_process::Stdio;
use async_trait::async_trait;
use std::io::ErrorKind;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::process::ExitResult;

/// Launcher for executing processes locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

#[async_trait]
impl Launcher for LocalLauncher {
    async fn execute(&self, command: Command) -> Result<ExitResult> {
        let mut async_cmd = command.prepare();

        // Stdin stays attached so sudo and package managers can still ask the operator
        async_cmd.stdin(Stdio::inherit());
        async_cmd.stdout(Stdio::piped());
        async_cmd.stderr(Stdio::piped());

        let output = async_cmd.output().await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::command_not_found(command.get_program().to_string_lossy())
            } else {
                Error::spawn_failed(format!("Failed to spawn process: {}", e))
            }
        })?;

        Ok(ExitResult {
            status: output.status.into(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
