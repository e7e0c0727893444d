//! Error types for provisioning

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while provisioning gateway containers
///
/// Fatal variants abort the whole run; every other variant only fails the
/// account being provisioned and the session moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// The host identification file is missing or unusable
    #[error("cannot identify host from {}: {reason}", path.display())]
    HostUnidentified {
        /// The identification file that was read
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// No installation recipe exists for this distribution
    #[error("unsupported distribution '{distro}': install the container runtime manually")]
    UnsupportedDistro {
        /// The distribution id from the host identification file
        distro: String,
    },

    /// A runtime installation step failed
    #[error("runtime installation failed at `{step}`: {reason}")]
    InstallFailed {
        /// The command line of the failing step
        step: String,
        /// Diagnostic output of the step
        reason: String,
    },

    /// A required tool is missing and is not installed automatically
    #[error("required tool '{tool}' not found: {hint}")]
    MissingTool {
        /// The missing tool
        tool: String,
        /// How the operator can fix it
        hint: String,
    },

    /// The operator's input stream ended
    #[error("operator input closed")]
    InputClosed,

    /// The listening-socket table could not be read
    #[error("cannot read listening sockets: {0}")]
    SocketTable(String),

    /// A container runtime call failed
    #[error("container runtime {operation} failed: {reason}")]
    Runtime {
        /// The runtime operation
        operation: String,
        /// Diagnostic output of the call
        reason: String,
    },

    /// Writing the configuration bundle failed
    #[error("cannot write configuration at {}: {source}", path.display())]
    Bundle {
        /// The file or directory being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Command execution errors
    #[error("command execution error: {0}")]
    Executor(#[from] command_executor::Error),

    /// Settings errors
    #[error(transparent)]
    Config(#[from] provision_config::ConfigError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must terminate the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::HostUnidentified { .. }
                | Error::UnsupportedDistro { .. }
                | Error::InstallFailed { .. }
                | Error::MissingTool { .. }
                | Error::Config(_)
        )
    }

    /// Create a runtime error from an operation name and diagnostic output
    pub fn runtime(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Runtime {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;
