//! Launcher implementations for different execution contexts
//!
//! Users can also implement their own launchers by implementing the
//! [`Launcher`](crate::launcher::Launcher) trait.

pub mod local;
pub mod sudo;

pub use local::LocalLauncher;
pub use sudo::SudoLauncher;
