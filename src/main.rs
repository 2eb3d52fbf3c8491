use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use powerd_bridge::client::StatusClient;
use powerd_bridge::config::BridgeConfig;
use powerd_bridge::coordinator::{RefreshEvent, UpdateCoordinator};
use powerd_bridge::entities::{self, EntityRegistry};

#[derive(Parser)]
#[command(
    name = "powerd-bridge",
    version,
    about = "Polling bridge for the Framework Power Daemon",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to POWERD_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the daemon host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override the daemon port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the daemon status once and print it
    Status,

    /// Fetch the daemon status once and print the derived points
    Points,

    /// Change the daemon power mode
    SetMode {
        /// Mode name passed to the daemon
        mode: String,
    },

    /// Verify the daemon is reachable and the token is accepted
    Check,

    /// Poll continuously and log every refresh until Ctrl-C
    Watch {
        /// Polling interval in seconds (1-600)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BridgeConfig::from_env(),
    };
    if let Some(host) = cli.host {
        config.daemon.host = host;
    }
    if let Some(port) = cli.port {
        config.daemon.port = port;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(base_url = %config.base_url(), "powerd-bridge starting");

    match cli.command {
        Commands::Status => status(&config).await?,
        Commands::Points => points(&config).await?,
        Commands::SetMode { mode } => {
            tracing::info!(mode = %mode, "Starting set-mode command");
            set_mode(&config, &mode).await?;
        }
        Commands::Check => check(&config).await?,
        Commands::Watch { interval } => {
            tracing::info!(interval = ?interval, "Starting watch command");
            watch(&config, interval).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("powerd_bridge=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("powerd_bridge={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn status(config: &BridgeConfig) -> Result<()> {
    let client = StatusClient::new(config.request_timeout())?;
    let snapshot = client.fetch_status(&config.endpoint()).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn points(config: &BridgeConfig) -> Result<()> {
    let client = StatusClient::new(config.request_timeout())?;
    let snapshot = client.fetch_status(&config.endpoint()).await?;
    let registry = EntityRegistry::from_config(config);

    println!("{} ({})", registry.device().name, registry.device().identifier);
    for point in registry.project(&snapshot) {
        println!("  {:<24} {}", point.name, point.value);
    }
    let interval = registry.polling_interval_point(config.scan_interval());
    println!("  {:<24} {}", interval.name, interval.value);
    Ok(())
}

async fn set_mode(config: &BridgeConfig, mode: &str) -> Result<()> {
    let client = StatusClient::new(config.request_timeout())?;
    let endpoint = config.endpoint();

    client
        .set_mode(&endpoint, mode)
        .await
        .with_context(|| format!("Failed to set mode '{mode}'"))?;

    let snapshot = client.fetch_status(&endpoint).await?;
    println!("Mode: {}", snapshot.mode().unwrap_or("unknown"));
    Ok(())
}

async fn check(config: &BridgeConfig) -> Result<()> {
    let client = StatusClient::new(config.request_timeout())?;

    match client.check_connection(&config.endpoint()).await {
        Ok(()) => {
            println!("ok");
            Ok(())
        }
        Err(kind) => {
            println!("{kind}");
            anyhow::bail!("Daemon check failed: {kind}")
        }
    }
}

async fn watch(config: &BridgeConfig, interval: Option<u64>) -> Result<()> {
    let coordinator = UpdateCoordinator::from_config(config)?;
    if let Some(secs) = interval {
        entities::set_polling_interval(&coordinator, secs)?;
    }

    let registry = EntityRegistry::from_config(config);
    let mut events = coordinator.subscribe();

    coordinator
        .start()
        .await
        .context("Initial refresh failed; is the daemon running?")?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => report(&coordinator, &registry, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped refresh events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.stop().await;
    Ok(())
}

fn report(coordinator: &UpdateCoordinator, registry: &EntityRegistry, event: &RefreshEvent) {
    if let Some(kind) = event.error {
        let age = coordinator
            .state()
            .last_success_at
            .map(|at| chrono::Utc::now() - at)
            .map(|d| Duration::from_secs(d.num_seconds().max(0) as u64));
        tracing::warn!(
            trigger = event.trigger.as_str(),
            kind = %kind,
            stale_for = ?age,
            "Refresh failed; keeping last snapshot"
        );
        return;
    }

    let Some(snapshot) = coordinator.current_snapshot() else {
        return;
    };

    for point in registry.project(&snapshot) {
        tracing::info!(
            trigger = event.trigger.as_str(),
            point = %point.name,
            value = %point.value,
            "Point updated"
        );
    }
}
