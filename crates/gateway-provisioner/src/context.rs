//! Execution context decided once at startup

use provision_config::PrivilegeMode;

/// Identity and privilege facts about the provisioning process
///
/// Computed once and passed to every component that needs it instead of
/// being looked up ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    uid: u32,
    gid: u32,
    privileged: bool,
    use_sudo: bool,
}

impl ExecutionContext {
    /// Build a context from explicit values
    pub fn new(uid: u32, gid: u32, privileged: bool, use_sudo: bool) -> Self {
        Self {
            uid,
            gid,
            privileged,
            use_sudo,
        }
    }

    /// Inspect the current process
    #[cfg(unix)]
    pub fn detect(mode: PrivilegeMode) -> Self {
        use nix::unistd::{geteuid, getgid, getuid};

        let privileged = geteuid().is_root();
        Self::new(
            getuid().as_raw(),
            getgid().as_raw(),
            privileged,
            Self::sudo_required(mode, privileged),
        )
    }

    /// Inspect the current process
    #[cfg(not(unix))]
    pub fn detect(mode: PrivilegeMode) -> Self {
        Self::new(0, 0, false, Self::sudo_required(mode, false))
    }

    fn sudo_required(mode: PrivilegeMode, privileged: bool) -> bool {
        match mode {
            PrivilegeMode::Auto => !privileged,
            PrivilegeMode::Sudo => true,
            PrivilegeMode::None => false,
        }
    }

    /// Real user id of the operator
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Real group id of the operator
    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// Whether the process already runs as root
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Whether runtime and installer commands get a `sudo` prefix
    pub fn uses_sudo(&self) -> bool {
        self.use_sudo
    }

    /// Owner and group for files the container creates
    pub fn container_identity(&self) -> (u32, u32) {
        if self.privileged {
            (0, 0)
        } else {
            (self.uid, self.gid)
        }
    }
}
