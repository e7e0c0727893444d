//! Interactive provisioner for per-account gateway containers

use anyhow::{Context, Result};
use clap::Parser;
use command_executor::{LocalLauncher, SudoLauncher};
use gateway_provisioner::{
    ExecutionContext, PackageManagerInstaller, ProvisioningSession, SessionEnd, StdinInput,
};
use std::path::PathBuf;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "gateway-provisioner")]
#[command(about = "Provision per-account bridge gateway containers")]
#[command(version)]
struct Cli {
    /// Settings file path; built-in defaults are used when it does not exist
    #[arg(short, long, default_value = "provisioner.yaml")]
    config: PathBuf,

    /// Directory holding the per-account data directories
    #[arg(long, value_name = "PATH")]
    base_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Skip host detection and dependency verification
    #[arg(long)]
    skip_dependency_check: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    smol::block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = provision_config::parser::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;
    if let Some(base_dir) = cli.base_dir {
        settings.layout.base_dir = base_dir;
    }

    let context = ExecutionContext::detect(settings.runtime.privilege);
    info!(
        "Running as uid {} (privileged: {}, sudo: {})",
        context.uid(),
        context.is_privileged(),
        context.uses_sudo()
    );

    let installer = PackageManagerInstaller::new(
        SudoLauncher::when(LocalLauncher, context.uses_sudo()),
        settings.runtime.registry_mirrors.clone(),
    );

    let mut session = ProvisioningSession::new(
        settings,
        context,
        LocalLauncher,
        StdinInput,
        Box::new(installer),
    )
    .skip_dependency_check(cli.skip_dependency_check);

    let summary = session.run().await.context("Provisioning aborted")?;
    if summary.ended_by == SessionEnd::InputClosed {
        info!("Input closed, ending session");
    }
    Ok(())
}
