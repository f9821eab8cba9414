// # ddnsd - DDNS Daemon
//
// Thin integration layer over `ddns-core`:
// 1. Parse the command line
// 2. Install the tracing subscriber
// 3. Locate, load and validate the configuration file
// 4. Register the compiled-in providers and build every configured one
// 5. Run one reconciliation pass, or the timer-driven loop until a signal
//
// All DDNS logic lives in ddns-core; nothing here knows about provider types.
//
// ## Usage
//
// ```bash
// # One pass, then exit
// ddnsd --config /etc/ddnsd/ddnsd.toml
//
// # Long-running daemon
// ddnsd --daemon
// ```
//
// ## Environment
//
// - `DDNSD_CONFIG_PATH`: configuration file, when `--config` is not given
// - `DDNSD_LOG_LEVEL`: trace, debug, info, warn or error

mod discovery;

use anyhow::{Context, Result};
use clap::Parser;
use ddns_core::{DdnsConfig, DdnsEngine, EngineEvent, ProviderRegistry, TcpProbe};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable overriding the log level
const LOG_LEVEL_ENV: &str = "DDNSD_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep DNS records at several providers pointed at this host's public IP.
#[derive(Parser, Debug)]
#[command(name = "ddnsd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Keep running and re-check on timers instead of a single pass
    #[arg(long)]
    daemon: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let (mut engine, events) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        tokio::spawn(log_events(events));

        let outcome = if cli.daemon {
            run_daemon(&mut engine).await
        } else {
            let report = engine.run_once().await;
            info!(
                "Run complete: {} reconciled ({} changed), {} skipped, {} failed",
                report.reconciled, report.changed, report.skipped, report.failed
            );
            Ok(())
        };

        match outcome {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Install the global subscriber
///
/// `DDNSD_LOG_LEVEL` overrides `--verbose`. ANSI colors are disabled in
/// daemon mode, where output usually ends up in a log collector.
fn init_tracing(cli: &Cli) -> Result<()> {
    let level = match env::var(LOG_LEVEL_ENV) {
        Ok(value) => parse_level(&value)?,
        Err(_) if cli.verbose => Level::DEBUG,
        Err(_) => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(!cli.daemon)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn parse_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => anyhow::bail!(
            "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_ENV,
            other
        ),
    }
}

/// Everything that must succeed before the first network call
fn prepare(cli: &Cli) -> Result<(DdnsEngine, mpsc::Receiver<EngineEvent>)> {
    let home = discovery::home_dir();
    let path = discovery::find_config(
        cli.config.as_deref(),
        env::var(discovery::CONFIG_PATH_ENV).ok().as_deref(),
        &discovery::default_candidates(home.as_deref()),
    )?;

    info!("Loading configuration from {}", path.display());
    let config = DdnsConfig::load(&path)?;

    let registry = build_registry();
    debug!("Registered providers: {}", registry.list_providers().join(", "));

    let providers = registry.build_all(&config.providers)?;
    let records: usize = providers.iter().map(|p| p.records.len()).sum();
    info!(
        "Configuration loaded: {} provider(s), {} record(s)",
        providers.len(),
        records
    );

    let resolver = ddns_ip_http::public_resolver();
    let probe = TcpProbe::from_settings(&config.general);

    let engine = DdnsEngine::new(
        Box::new(resolver),
        Box::new(probe),
        providers,
        &config.general,
    )?;
    Ok(engine)
}

/// Registry with every provider compiled into this binary
fn build_registry() -> ProviderRegistry {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(&mut registry);

    #[cfg(feature = "digitalocean")]
    ddns_provider_digitalocean::register(&mut registry);

    #[cfg(feature = "route53")]
    ddns_provider_route53::register(&mut registry);

    #[cfg(feature = "dyndns")]
    ddns_provider_dyndns::register(&mut registry);

    registry
}

/// Run the timer loop until SIGTERM or SIGINT
async fn run_daemon(engine: &mut DdnsEngine) -> Result<()> {
    let shutdown = shutdown_signal()?;

    info!("Starting ddnsd daemon");
    engine.run_with_shutdown(shutdown).await;
    Ok(())
}

/// Resolve once SIGTERM or SIGINT arrives
///
/// Handlers are installed before returning, so a signal delivered while the
/// startup pass runs is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Resolve once Ctrl-C arrives
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: Ctrl-C"),
            Err(e) => error!("Failed to wait for Ctrl-C: {}", e),
        }
    })
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "engine event");
    }
}
