//! CLI entrypoint for endorse
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use endorse_application::{ClientCache, DeployProgressNotifier, LedgerController, NoProgress};
use endorse_domain::OperationResult;
use endorse_infrastructure::{
    ConfigLoader, FileConfig, JsonlAuditLogger, SimulatedConnector, SimulatedNetwork,
};
use endorse_presentation::{
    ChannelCommand, Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_ref());

    info!("Starting endorse");

    let file_config = load_config(&cli)?;

    if matches!(cli.command, Command::ShowConfig) {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        println!();
        println!("{}", toml::to_string_pretty(&file_config)?);
        for issue in file_config.validate() {
            println!("warning: {}", issue);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let issues = file_config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("config error: {}", issue);
        }
        bail!("invalid configuration ({} issue(s))", issues.len());
    }

    if !file_config.output.color {
        ConsoleFormatter::set_color(false);
    }
    let format = cli.output.unwrap_or(if file_config.output.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    });

    // === Dependency Injection ===
    let network_config = file_config.to_network_config()?;
    let network = match file_config.simulation_state_path() {
        Some(path) => SimulatedNetwork::open(network_config.clone(), &path).await?,
        None => SimulatedNetwork::new(network_config.clone()),
    };
    let network = Arc::new(network);

    let connector = Arc::new(SimulatedConnector::new(Arc::clone(&network)));
    let cache = Arc::new(ClientCache::new(connector));
    let mut controller = LedgerController::new(
        cache,
        Arc::new(network_config),
        file_config.to_execution_params(),
    );

    if let Some(path) = file_config.audit_path() {
        match JsonlAuditLogger::new(&path) {
            Some(logger) => {
                info!("Audit trail: {}", path.display());
                controller = controller.with_audit_logger(Arc::new(logger));
            }
            None => warn!("Audit trail {} could not be opened", path.display()),
        }
    }

    let quiet = cli.quiet || format == OutputFormat::Json;
    let outcome = run(&controller, cli.command, quiet).await;

    controller.shutdown().await;
    network.persist().await?;

    let result = outcome?;
    let rendered = match format {
        OutputFormat::Text => ConsoleFormatter::format(&result),
        OutputFormat::Json => ConsoleFormatter::format_json(&result),
    };
    println!("{}", rendered.trim_end());

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8, log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "endorse.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")
}

async fn run(
    controller: &LedgerController,
    command: Command,
    quiet: bool,
) -> Result<OperationResult> {
    let result = match command {
        Command::Deploy(args) => {
            let mut request = args.to_request();
            if let Some(path) = &args.package {
                let package = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read package {}", path.display()))?;
                request.package = Some(package);
            }
            let progress: Box<dyn DeployProgressNotifier> = if quiet {
                Box::new(NoProgress)
            } else {
                Box::new(ProgressReporter::new())
            };
            controller.deploy(request, progress.as_ref()).await
        }
        Command::Submit(args) => controller.submit(&args.to_request()).await,
        Command::Evaluate(args) => controller.evaluate(&args.to_request()).await,
        Command::LatestVersion { unit, organization } => {
            controller
                .latest_version(&unit, organization.as_deref())
                .await
        }
        Command::Installed { organization } => {
            controller.installed_units(organization.as_deref()).await
        }
        Command::Channel(ChannelCommand::Create(args)) => {
            let envelope = read_text(&args.envelope).await?;
            controller.create_channel(&args.to_request(envelope)).await
        }
        Command::Channel(ChannelCommand::Update(args)) => {
            let envelope = read_text(&args.envelope).await?;
            controller.update_channel(&args.to_request(envelope)).await
        }
        Command::Channel(ChannelCommand::Join {
            channel,
            organization,
        }) => {
            let request = ChannelCommand::join_request(&channel, organization.as_deref());
            controller.join_channel(&request).await
        }
        Command::Call { operation, body } => {
            let body = match body {
                None => Value::Null,
                Some(raw) => {
                    let text = match raw.strip_prefix('@') {
                        Some(path) => read_text(Path::new(path)).await?,
                        None => raw,
                    };
                    serde_json::from_str(&text).context("request body is not valid JSON")?
                }
            };
            controller.dispatch(&operation, body).await
        }
        Command::ShowConfig => bail!("show-config is handled before connecting"),
    };
    Ok(result)
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
