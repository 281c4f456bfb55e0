// ABOUTME: Entry point for the stockade CLI.
// ABOUTME: Parses arguments, wires up collaborators, and dispatches to command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ModeArg};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use stockade::catalog::Catalog;
use stockade::config::{self, Config};
use stockade::error::{Error, Result};
use stockade::graph::DependencyGraph;
use stockade::launch::CommandLauncher;
use stockade::output::{Output, OutputMode};
use stockade::ports;
use stockade::preflight::run_preflight;
use stockade::probe::{self, ReqwestFetcher};
use stockade::provision::provision_all;
use stockade::runtime::{BollardRuntime, ContainerOps, NetworkOps, detect_local};
use stockade::session::{
    Mode, Scheduler, SessionLedger, SessionLock, finalize, rollback_session,
};
use stockade::types::ServiceName;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    match runtime.block_on(run(cli, &output)) {
        Ok(success) => {
            if success {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::from(1)
            }
        }
        Err(e) => {
            output.error(&e.to_string());
            std::process::ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<bool> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = std::env::current_dir()?;
            config::init_config(&cwd, force)?;
            output.success("wrote stockade.yml");
            Ok(true)
        }
        Commands::Deploy {
            mode,
            services,
            skip_preflight,
            force_lock,
            deploy_root,
        } => {
            let config = load_config(deploy_root)?;
            deploy(config, mode, services, skip_preflight, force_lock, output).await
        }
        Commands::Status => {
            let config = load_config(None)?;
            status(config, output).await?;
            Ok(true)
        }
        Commands::Teardown { keep_network } => {
            let config = load_config(None)?;
            teardown(config, keep_network, output).await?;
            Ok(true)
        }
    }
}

fn load_config(deploy_root: Option<PathBuf>) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let mut config = Config::discover(&cwd)?;
    if let Some(root) = deploy_root {
        config.deploy_root = root;
    }
    Ok(config)
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    match &config.catalog {
        Some(path) => Ok(Catalog::load(path)?),
        None => Ok(Catalog::builtin()),
    }
}

/// Resolve the requested mode into a target set over the catalog.
fn resolve_targets(
    catalog: &Catalog,
    mode: ModeArg,
    services: &[String],
) -> Result<(Mode, Vec<ServiceName>)> {
    match mode {
        ModeArg::Full => Ok((Mode::Full, catalog.names())),
        ModeArg::Simple => Ok((Mode::Simple, stockade::catalog::simple_subset())),
        ModeArg::Custom => {
            if services.is_empty() {
                return Err(Error::InvalidConfig(
                    "custom mode requires --services".to_string(),
                ));
            }
            let names = services
                .iter()
                .map(|s| ServiceName::new(s).map_err(|e| Error::InvalidConfig(e.to_string())))
                .collect::<Result<Vec<_>>>()?;
            Ok((Mode::Custom, names))
        }
    }
}

async fn deploy(
    config: Config,
    mode: ModeArg,
    services: Vec<String>,
    skip_preflight: bool,
    force_lock: bool,
    output: &Output,
) -> Result<bool> {
    let catalog = load_catalog(&config)?;

    // Fail fast on graph problems before anything touches the host.
    let graph = DependencyGraph::build(&catalog)?;
    let (mode, requested) = resolve_targets(&catalog, mode, &services)?;
    let targets = graph.closure(&requested)?;

    output.progress(&format!(
        "deploying {} service(s) in {} mode",
        targets.len(),
        mode
    ));

    let lock = SessionLock::acquire(&config.lock_path(), force_lock)?;

    let detected = detect_local(config.runtime_socket.as_deref())
        .map_err(stockade::runtime::RuntimeError::from)?;
    output.progress(&format!(
        "using {} at {}",
        detected.runtime_type, detected.socket_path
    ));
    let runtime = BollardRuntime::connect(&detected)
        .map_err(stockade::runtime::RuntimeError::from)?;

    if skip_preflight {
        output.warn("pre-flight checks skipped");
    } else {
        run_preflight(&runtime, &config).await?;
    }

    let ledger = SessionLedger::new();

    // Shared resources first. Provisioning failure is fatal: tear down
    // anything this session created and report what was rolled back.
    let (provisioned, network_id) = match provision_all(&runtime, &config, &catalog).await {
        Ok(result) => result,
        Err(e) => {
            let report = rollback_session(&runtime, &ledger).await;
            output.error(&format!("provisioning failed: {e}"));
            output.progress(&report.summary());
            lock.release();
            return Err(e.into());
        }
    };
    ledger.record_network(network_id);

    // Operator abort flips the flag; the wait loop observes it between
    // poll cycles.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("cancellation requested");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let launcher = CommandLauncher::new(config.deploy_root.clone(), launch_env(&config));
    let http = ReqwestFetcher::new(config.probe.request_timeout);

    let scheduler = Scheduler::new(&runtime, &launcher, &http, &config, cancel);
    let session = scheduler
        .run(&graph, &catalog, &targets, mode, &ledger, output)
        .await;

    let report = finalize(&session, &catalog, &config, &provisioned);
    match report.persist(&config) {
        Ok(path) => output.progress(&format!("report written to {}", path.display())),
        Err(e) => output.warn(&format!("failed to persist report: {e}")),
    }

    let success = session.is_success();
    if success {
        output.success(&report.summary());
    } else {
        output.error(&report.summary());
    }

    lock.release();
    Ok(success)
}

/// Environment handed to every launch command: the persisted state
/// locations plus anything the operator configured.
fn launch_env(config: &Config) -> HashMap<String, String> {
    let mut env = config.launch_env.clone();
    env.insert(
        "STOCKADE_SECRETS_FILE".to_string(),
        config.secrets_path().display().to_string(),
    );
    env.insert(
        "STOCKADE_CERTS_DIR".to_string(),
        config.certs_dir().display().to_string(),
    );
    env.insert("STOCKADE_NETWORK".to_string(), config.network.name.clone());
    env.insert("STOCKADE_DOMAIN".to_string(), config.domain.clone());
    env
}

async fn status(config: Config, output: &Output) -> Result<()> {
    let catalog = load_catalog(&config)?;

    let detected = detect_local(config.runtime_socket.as_deref())
        .map_err(stockade::runtime::RuntimeError::from)?;
    let runtime = BollardRuntime::connect(&detected)
        .map_err(stockade::runtime::RuntimeError::from)?;
    let http = ReqwestFetcher::new(config.probe.request_timeout);

    for svc in catalog.services() {
        let readiness = probe::classify(&runtime, &http, svc).await;
        output.service(svc.name.as_str(), readiness.describe());
    }

    Ok(())
}

async fn teardown(config: Config, keep_network: bool, output: &Output) -> Result<()> {
    let catalog = load_catalog(&config)?;

    let detected = detect_local(config.runtime_socket.as_deref())
        .map_err(stockade::runtime::RuntimeError::from)?;
    let runtime = BollardRuntime::connect(&detected)
        .map_err(stockade::runtime::RuntimeError::from)?;

    for svc in catalog.services() {
        match runtime
            .inspect_container_by_name(svc.name.container_name())
            .await
        {
            Ok(info) => {
                let _ = runtime
                    .stop_container(&info.id, Duration::from_secs(10))
                    .await;
                match runtime.remove_container(&info.id, true).await {
                    Ok(()) => output.service(svc.name.as_str(), "removed"),
                    Err(e) => output.warn(&format!("failed to remove {}: {e}", svc.name)),
                }
            }
            Err(_) => output.service(svc.name.as_str(), "not present"),
        }
    }

    // Quick occupancy snapshot so the operator sees leftovers.
    for svc in catalog.services() {
        for spec in &svc.ports {
            if ports::listening(spec.port).await {
                output.warn(&format!("port {} still has a listener", spec));
            }
        }
    }

    if !keep_network {
        if let Some(details) = runtime
            .inspect_network(&config.network.name)
            .await
            .map_err(stockade::provision::ProvisionError::from)?
        {
            match runtime.remove_network(&details.id).await {
                Ok(()) => output.service(&config.network.name, "network removed"),
                Err(e) => output.warn(&format!("failed to remove network: {e}")),
            }
        }
    }

    output.success("teardown complete");
    Ok(())
}
