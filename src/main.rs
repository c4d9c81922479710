use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use svs::alloc::{HostFs, HostPortProbe, PortAllocator, VolumeAllocator};
use svs::config::{self, Config};
use svs::container::{DriftDetector, Materializer, Reconciler};
use svs::model::ContainerSpec;
use svs::runtime::{ContainerRuntime, DockerCli, SystemAccounts, ensure_available};

#[derive(Parser)]
#[command(name = "svs", version, about = "Reconcile containers on this host against their specs")]
struct Cli {
    /// Directory holding the `.svsc` configuration file.
    #[arg(long, global = true, default_value = ".")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the container runtime is reachable.
    Check,
    /// Print a free host port from the configured range.
    Port,
    /// Allocate a fresh volume directory for an owner.
    Volume { owner_id: u32 },
    /// Print the runtime arguments a spec would be created with.
    Plan { spec: PathBuf },
    /// Create the container described by a spec.
    Create { spec: PathBuf },
    /// Report how the live container differs from a spec. Exits 1 on drift.
    Drift { spec: PathBuf },
    /// Recreate the container if it drifted from its spec.
    Reconcile { spec: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    svs::logging::init(cfg.environment);
    info!(environment = cfg.environment.as_str(), "configuration loaded");
    run(cli.command, &cfg)
}

fn run(command: Command, cfg: &Config) -> Result<ExitCode> {
    let runtime = DockerCli::new(cfg.runtime_binary.clone());
    let accounts = SystemAccounts;
    let materializer = Materializer::new(&runtime, &accounts, cfg);

    match command {
        Command::Check => {
            ensure_available(runtime.binary())?;
            println!("{} is available", runtime.binary());
        }
        Command::Port => {
            let port = PortAllocator::from_config(&HostPortProbe, cfg).find_free_port()?;
            println!("{port}");
        }
        Command::Volume { owner_id } => {
            let path = VolumeAllocator::from_config(&HostFs, cfg).generate_free_volume(owner_id)?;
            println!("{}", path.display());
        }
        Command::Plan { spec } => {
            let request = materializer.plan(&read_spec(&spec)?)?;
            println!("{}", shell_words::join(DockerCli::create_args(&request)));
        }
        Command::Create { spec } => {
            let handle = materializer.create(&read_spec(&spec)?)?;
            println!("{}", handle.id);
        }
        Command::Drift { spec } => {
            let desired = read_spec(&spec)?;
            let observed = find(&runtime, &desired)?;
            let drift = DriftDetector::new(&runtime).check(&observed, &desired)?;
            if drift.is_empty() {
                println!("{} matches its spec", desired.name);
            } else {
                for d in &drift {
                    println!("{d}");
                }
                return Ok(ExitCode::from(1));
            }
        }
        Command::Reconcile { spec } => {
            let desired = read_spec(&spec)?;
            let observed = find(&runtime, &desired)?;
            if !DriftDetector::new(&runtime).has_changed(&observed, &desired)? {
                println!("{} is up to date", desired.name);
                return Ok(ExitCode::SUCCESS);
            }
            let reconciler = Reconciler::new(&runtime, &materializer, cfg.stop_timeout);
            let handle = reconciler.recreate(&observed, &desired)?;
            if observed.is_running() {
                runtime.start(&handle.id)?;
            }
            println!("{}", handle.id);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_spec(path: &Path) -> Result<ContainerSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn find(runtime: &DockerCli, spec: &ContainerSpec) -> Result<svs::runtime::ObservedContainer> {
    runtime
        .get_by_name(&spec.name)?
        .with_context(|| format!("no container named '{}'", spec.name))
}
