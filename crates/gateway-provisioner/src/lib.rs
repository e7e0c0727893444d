//! # Gateway Provisioner
//!
//! Provisions one bridge gateway container per chat account on a single
//! host. For every account entered by the operator it allocates two free
//! host ports, writes the configuration bundle into the account's data
//! directory and replaces any container of the same name with a fresh one.
//!
//! # Architecture
//!
//! - [`host::RuntimeDetector`] identifies the distribution
//! - [`dependencies::DependencyVerifier`] checks the runtime and helper
//!   tools, running a [`dependencies::RuntimeInstaller`] when the runtime is
//!   missing
//! - [`ports::PortAllocator`] validates operator port choices against the
//!   live socket table
//! - [`bundle::ConfigBundler`] writes the JSON documents
//! - [`lifecycle::ContainerLifecycleManager`] detects, removes, starts and
//!   verifies containers
//! - [`session::ProvisioningSession`] drives all of the above per account
//!
//! External commands go through a [`command_executor::Launcher`] and operator
//! input through a [`prompt::InputProvider`], so both can be scripted.

#![warn(missing_docs)]

pub mod account;
pub mod bundle;
pub mod context;
pub mod dependencies;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod ports;
pub mod prompt;
pub mod report;
pub mod session;

pub use account::{AccountId, AccountLayout};
pub use context::ExecutionContext;
pub use dependencies::{DependencyVerifier, PackageManagerInstaller, RuntimeInstaller};
pub use error::{Error, Result};
pub use host::{HostInfo, OsFamily, RuntimeDetector};
pub use lifecycle::{ContainerLifecycleManager, ContainerState, LifecycleReport};
pub use ports::{PortAllocator, PortBinding, PortPurpose};
pub use prompt::{InputProvider, ScriptedInput, StdinInput};
pub use session::{AccountOutcome, AccountRecord, ProvisioningSession, SessionEnd, SessionSummary};
