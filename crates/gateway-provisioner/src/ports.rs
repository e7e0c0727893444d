//! Host port allocation against the live socket table
//!
//! The check is best effort: a port accepted here is not reserved, so
//! another process may bind it between acceptance and container start.
//! The socket table is re-read right before every acceptance to keep that
//! window small.

use crate::prompt::{InputProvider, ask};
use crate::{Error, Result};
use command_executor::{Command, Executor, Launcher};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// Port the gateway API listens on inside the container
pub const API_CONTAINER_PORT: u16 = 3001;
/// Port the web console listens on inside the container
pub const WEBUI_CONTAINER_PORT: u16 = 6099;

/// What a published port is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPurpose {
    /// Gateway API
    Api,
    /// Web console
    WebUi,
}

impl PortPurpose {
    /// Port inside the container
    pub fn container_port(self) -> u16 {
        match self {
            PortPurpose::Api => API_CONTAINER_PORT,
            PortPurpose::WebUi => WEBUI_CONTAINER_PORT,
        }
    }
}

impl fmt::Display for PortPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortPurpose::Api => f.write_str("API"),
            PortPurpose::WebUi => f.write_str("WebUI"),
        }
    }
}

/// A host port published to a container port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    /// Port on the host
    pub host_port: u16,
    /// Port inside the container
    pub container_port: u16,
    /// What the port is for
    pub purpose: PortPurpose,
}

impl PortBinding {
    /// Bind `host_port` to the container port for `purpose`
    pub fn new(host_port: u16, purpose: PortPurpose) -> Self {
        Self {
            host_port,
            container_port: purpose.container_port(),
            purpose,
        }
    }

    /// The `-p` argument for the runtime
    pub fn publish_arg(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }
}

/// Why an answer was not accepted as a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortRejection {
    /// Not a non-negative integer
    NotNumeric(String),
    /// Outside 1..=65535
    OutOfRange(u64),
    /// Already chosen for another purpose of the same account
    AlreadyChosen(u16),
    /// Present in the listening-socket table
    InUse(u16),
}

impl fmt::Display for PortRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRejection::NotNumeric(raw) => write!(f, "'{}' is not a port number", raw),
            PortRejection::OutOfRange(port) => {
                write!(f, "port {} is out of range (1-65535)", port)
            }
            PortRejection::AlreadyChosen(port) => {
                write!(f, "port {} is already used by this account", port)
            }
            PortRejection::InUse(port) => write!(f, "port {} is already in use", port),
        }
    }
}

/// Parse a port answer without consulting the host
pub fn parse_port(raw: &str) -> std::result::Result<u16, PortRejection> {
    let raw = raw.trim();
    let value: u64 = raw
        .parse()
        .map_err(|_| PortRejection::NotNumeric(raw.to_string()))?;
    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(PortRejection::OutOfRange(value)),
    }
}

/// Local ports from `ss -tuln` output
///
/// The local address is the fifth column; its trailing `:port` part is
/// parsed as an integer. Header and malformed lines are skipped.
pub fn parse_listening_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .filter_map(|local| local.rsplit(':').next())
        .filter_map(|port| port.parse::<u16>().ok())
        .collect()
}

/// Prompts for host ports and checks them against the socket table
pub struct PortAllocator<L: Launcher> {
    executor: Executor<L>,
}

impl<L: Launcher> PortAllocator<L> {
    /// Create an allocator querying the socket table through `launcher`
    pub fn new(launcher: L) -> Self {
        Self {
            executor: Executor::new("port-allocator", launcher),
        }
    }

    /// Snapshot of every TCP and UDP port currently bound on the host
    pub async fn listening_ports(&self) -> Result<BTreeSet<u16>> {
        let result = self
            .executor
            .execute(Command::builder("ss").arg("-tuln").build())
            .await?;
        if !result.success() {
            return Err(Error::SocketTable(result.diagnostic().to_string()));
        }
        let ports = parse_listening_ports(&result.output);
        debug!("{} listening ports on host", ports.len());
        Ok(ports)
    }

    /// Check one candidate against the chosen ports and a fresh snapshot
    pub async fn check(
        &self,
        port: u16,
        already_chosen: &[u16],
    ) -> Result<std::result::Result<u16, PortRejection>> {
        if already_chosen.contains(&port) {
            return Ok(Err(PortRejection::AlreadyChosen(port)));
        }
        if self.listening_ports().await?.contains(&port) {
            return Ok(Err(PortRejection::InUse(port)));
        }
        Ok(Ok(port))
    }

    /// Ask for a port until an acceptable one is given
    ///
    /// An empty answer selects `default`. A rejected default is reported and
    /// asked again; it is never adjusted automatically.
    pub async fn allocate(
        &self,
        input: &mut impl InputProvider,
        label: &str,
        default: u16,
        already_chosen: &[u16],
    ) -> Result<u16> {
        loop {
            let answer = ask(input, label, &default.to_string())?;
            let verdict = match parse_port(&answer) {
                Ok(port) => self.check(port, already_chosen).await?,
                Err(rejection) => Err(rejection),
            };

            match verdict {
                Ok(port) => {
                    info!("Accepted host port {} for {}", port, label);
                    return Ok(port);
                }
                Err(rejection) => {
                    debug!("Rejected port answer for {}: {}", label, rejection);
                    input.notify(&format!("{}, choose another port.", rejection));
                }
            }
        }
    }
}
