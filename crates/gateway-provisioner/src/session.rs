//! The interactive provisioning loop

use crate::account::{AccountId, AccountLayout};
use crate::bundle::{BridgeClient, ConfigBundler};
use crate::context::ExecutionContext;
use crate::dependencies::{DependencyVerifier, RuntimeInstaller};
use crate::host::RuntimeDetector;
use crate::lifecycle::{ContainerLifecycleManager, ContainerSpec, ContainerState, LifecycleReport};
use crate::ports::{PortAllocator, PortBinding, PortPurpose};
use crate::prompt::{InputProvider, ask, ask_required, confirm};
use crate::report;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use command_executor::{Launcher, SudoLauncher};
use provision_config::Settings;
use std::io;
use tracing::{error, info, warn};

/// How one account ended
#[derive(Debug, Clone)]
pub enum AccountOutcome {
    /// The recreate cycle ran; the report says whether it ended `Running`
    Lifecycle(LifecycleReport),
    /// A per-account error stopped provisioning before or during the cycle
    Error(String),
}

impl AccountOutcome {
    /// Final container state; errors count as `Failed`
    pub fn final_state(&self) -> ContainerState {
        match self {
            AccountOutcome::Lifecycle(report) => report.final_state(),
            AccountOutcome::Error(_) => ContainerState::Failed,
        }
    }
}

/// One pass through the loop
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// The account provisioned
    pub account: AccountId,
    /// Its container name
    pub container_name: String,
    /// Host ports accepted, in allocation order
    pub ports: Vec<PortBinding>,
    /// How it ended
    pub outcome: AccountOutcome,
    /// When it ended
    pub finished_at: DateTime<Local>,
}

impl AccountRecord {
    /// Host port accepted for `purpose`
    pub fn host_port(&self, purpose: PortPurpose) -> Option<u16> {
        self.ports
            .iter()
            .find(|binding| binding.purpose == purpose)
            .map(|binding| binding.host_port)
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The operator declined to continue
    Declined,
    /// The operator's input closed
    InputClosed,
}

/// Every account handled in one run
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Records in the order accounts were entered
    pub records: Vec<AccountRecord>,
    /// Why the session ended
    pub ended_by: SessionEnd,
}

/// Drives detection, dependency checks and provisioning one account at a time
pub struct ProvisioningSession<L: Launcher + Clone, I: InputProvider> {
    settings: Settings,
    context: ExecutionContext,
    launcher: L,
    input: I,
    installer: Box<dyn RuntimeInstaller>,
    detector: RuntimeDetector,
    ports: PortAllocator<L>,
    lifecycle: ContainerLifecycleManager<SudoLauncher<L>>,
    bundler: ConfigBundler,
    skip_dependency_check: bool,
    dependencies_verified: bool,
}

impl<L: Launcher + Clone, I: InputProvider> ProvisioningSession<L, I> {
    /// Create a session
    ///
    /// Runtime calls get the privilege prefix when `context` asks for it;
    /// presence checks and the socket table query run unprefixed.
    pub fn new(
        settings: Settings,
        context: ExecutionContext,
        launcher: L,
        input: I,
        installer: Box<dyn RuntimeInstaller>,
    ) -> Self {
        let privileged = SudoLauncher::when(launcher.clone(), context.uses_sudo());
        Self {
            detector: RuntimeDetector::new(&settings.host.os_release),
            ports: PortAllocator::new(launcher.clone()),
            lifecycle: ContainerLifecycleManager::new(privileged, &settings.runtime.binary),
            bundler: ConfigBundler::new(),
            settings,
            context,
            launcher,
            input,
            installer,
            skip_dependency_check: false,
            dependencies_verified: false,
        }
    }

    /// Skip host detection and dependency verification
    pub fn skip_dependency_check(mut self, skip: bool) -> Self {
        self.skip_dependency_check = skip;
        self
    }

    /// Run until the operator stops or a fatal error occurs
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let mut records = Vec::new();

        let ended_by = loop {
            let account = match self.prompt_account() {
                Ok(account) => account,
                Err(Error::InputClosed) => break SessionEnd::InputClosed,
                Err(e) => return Err(e),
            };
            let layout = AccountLayout::new(
                account.clone(),
                &self.settings.layout.base_dir,
                &self.settings.layout.name_prefix,
            );

            if let Err(e) = self.ensure_dependencies().await {
                error!("Dependency verification failed: {}", e);
                return Err(e);
            }

            let mut ports = Vec::new();
            let outcome = match self.provision(&layout, &mut ports).await {
                Ok(report) => AccountOutcome::Lifecycle(report),
                Err(Error::InputClosed) => break SessionEnd::InputClosed,
                Err(e) if e.is_fatal() => {
                    error!("Provisioning {} failed: {}", layout.container_name(), e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Provisioning {} failed: {}", layout.container_name(), e);
                    AccountOutcome::Error(e.to_string())
                }
            };

            let record = AccountRecord {
                account,
                container_name: layout.container_name().to_string(),
                ports,
                outcome,
                finished_at: Local::now(),
            };
            for line in report::outcome_lines(&record) {
                self.input.notify(&line);
            }
            records.push(record);

            match confirm(&mut self.input, "Provision another account?") {
                Ok(true) => continue,
                Ok(false) => break SessionEnd::Declined,
                Err(Error::InputClosed) => break SessionEnd::InputClosed,
                Err(e) => return Err(e),
            }
        };

        info!("Session ended ({:?}) after {} account(s)", ended_by, records.len());
        let summary = SessionSummary { records, ended_by };
        if !summary.records.is_empty() {
            self.input
                .notify(&report::summary_table(&summary).to_string());
        }
        Ok(summary)
    }

    fn prompt_account(&mut self) -> Result<AccountId> {
        loop {
            let raw = match ask_required(&mut self.input, "Account id") {
                Ok(raw) => raw,
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!("Unreadable account id: {}", e);
                    self.input.notify("The account id could not be read, try again.");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match AccountId::parse(&raw) {
                Some(account) => return Ok(account),
                None => self.input.notify("Account ids contain digits only."),
            }
        }
    }

    async fn ensure_dependencies(&mut self) -> Result<()> {
        if self.dependencies_verified || self.skip_dependency_check {
            return Ok(());
        }

        let host = self.detector.detect()?;
        let mut tools = vec![self.settings.runtime.binary.clone()];
        for tool in &self.settings.host.required_tools {
            if !tools.contains(tool) {
                tools.push(tool.clone());
            }
        }

        let verifier = DependencyVerifier::new(
            self.launcher.clone(),
            self.installer.as_ref(),
            &self.settings.runtime.binary,
        );
        verifier.verify(&host, &tools).await?;

        self.dependencies_verified = true;
        Ok(())
    }

    async fn provision(
        &mut self,
        layout: &AccountLayout,
        ports: &mut Vec<PortBinding>,
    ) -> Result<LifecycleReport> {
        info!("Provisioning account {}", layout.account());

        let cleanup = self
            .lifecycle
            .cleanup_if_stale(layout.container_name())
            .await?;

        let defaults = &self.settings.defaults;
        let name = ask(&mut self.input, "Client name", &defaults.client_name)?;
        let url = ask(&mut self.input, "WebSocket URL", &defaults.ws_url)?;
        let interval = ask(
            &mut self.input,
            "Reconnect interval (ms)",
            &defaults.reconnect_interval_ms.to_string(),
        )?;
        let written = self
            .bundler
            .write(layout, &BridgeClient::new(name, url, &interval))?;
        self.input.notify(&format!(
            "Configuration written to {}",
            written.config_dir.display()
        ));

        let api_port = self
            .ports
            .allocate(
                &mut self.input,
                "API port",
                layout.default_api_port(self.settings.defaults.api_base_port),
                &[],
            )
            .await?;
        ports.push(PortBinding::new(api_port, PortPurpose::Api));

        let webui_port = self
            .ports
            .allocate(
                &mut self.input,
                "WebUI port",
                self.settings.defaults.console_port,
                &[api_port],
            )
            .await?;
        ports.push(PortBinding::new(webui_port, PortPurpose::WebUi));

        let spec = ContainerSpec::for_account(layout, &self.settings, &self.context, ports.clone());
        self.lifecycle.recreate(&spec, cleanup).await
    }
}
