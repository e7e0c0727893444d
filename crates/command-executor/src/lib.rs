//! Runtime-agnostic command execution library
//!
//! This crate provides a unified interface for executing external commands:
//! locally, behind a privilege-escalation prefix, or against a scripted fake
//! when the caller needs deterministic behaviour in tests.

#![warn(missing_docs)]

pub mod backends;
pub mod command;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod process;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backends::{LocalLauncher, SudoLauncher};
pub use command::{Command, CommandBuilder};
pub use error::{Error, Result};
pub use executor::Executor;
pub use launcher::Launcher;
pub use process::{ExitResult, ExitStatus};
