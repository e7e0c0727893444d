//! Scripted launcher for deterministic tests
//!
//! Records every command it receives and answers with whatever the
//! responder closure returns, so callers can fake an external CLI without
//! spawning processes.

use crate::command::Command;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::process::ExitResult;
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&Command) -> Result<ExitResult> + Send + Sync>;

/// A launcher whose results come from a closure
pub struct ScriptedLauncher {
    responder: Responder,
    history: Mutex<Vec<Command>>,
}

impl ScriptedLauncher {
    /// Create a launcher answering every command with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Result<ExitResult> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            history: Mutex::new(Vec::new()),
        }
    }

    /// A launcher on which every command succeeds with empty output
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(ExitResult::ok("")))
    }

    /// Commands executed so far, in order
    pub fn history(&self) -> Vec<Command> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Executed commands rendered as shell lines
    pub fn command_lines(&self) -> Vec<String> {
        self.history().iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn execute(&self, command: Command) -> Result<ExitResult> {
        let result = (self.responder)(&command);
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[smol_potat::test]
    async fn test_responder_and_history() {
        let launcher = ScriptedLauncher::new(|cmd| match cmd.argv()[0].as_str() {
            "ss" => Ok(ExitResult::ok("tcp LISTEN 0 4096 0.0.0.0:22 0.0.0.0:*\n")),
            other => Err(Error::command_not_found(other)),
        });

        let ok = launcher.execute(Command::builder("ss").arg("-tuln").build()).await;
        assert!(ok.unwrap().output.contains(":22"));

        let err = launcher.execute(Command::new("docker")).await;
        assert!(matches!(err, Err(Error::CommandNotFound { .. })));

        assert_eq!(launcher.command_lines(), vec!["ss -tuln", "docker"]);
    }
}
