//! Process exit types

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// An exit status carrying the given code
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            #[cfg(unix)]
            signal: None,
        }
    }

    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        #[cfg(unix)]
        {
            self.signal.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
        }
    }
}

/// Exit status together with the captured output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitResult {
    /// How the process exited
    pub status: ExitStatus,
    /// Captured standard output
    pub output: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExitResult {
    /// A successful result with the given standard output
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            status: ExitStatus::from_code(0),
            output: output.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and standard error
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: ExitStatus::from_code(code),
            output: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with code 0
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Standard error if present, otherwise standard output, trimmed
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.output.trim()
        } else {
            stderr
        }
    }
}
