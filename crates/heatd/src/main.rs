//! heatd — the heatgrid daemon.
//!
//! Single binary that assembles the heatgrid subsystems:
//! - Load sensor (simulated) behind the retrying reader
//! - Server registry (state machines + routing freeze)
//! - Per-server cycle monitor
//! - REST API
//!
//! # Usage
//!
//! ```text
//! heatd standalone --config /etc/heatgrid/heatgrid.toml --port 8088
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use heat_core::HeatConfig;
use heat_core::config::{LogFormat, LoggingConfig, SensorConfig};
use heatgrid_api::{ApiState, build_router};
use heatgrid_engine::{CycleMonitor, ServerRegistry};
use heatgrid_router::FreezePolicy;
use heatgrid_sensor::{SensorReader, SimulatedSensor};

#[derive(Parser)]
#[command(name = "heatd", about = "heatgrid daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in standalone mode (all subsystems in one process).
    Standalone {
        /// Path to heatgrid.toml. Built-in defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on. Overrides `[server].port`.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Standalone { config, port } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            init_tracing(&config.logging);
            run_standalone(config).await
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HeatConfig> {
    match path {
        Some(path) => HeatConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(HeatConfig::default()),
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// A reader over a fresh simulator, so each caller walks the load phases
/// at its own pace.
fn simulated_reader(config: &SensorConfig) -> Arc<SensorReader> {
    let sensor = Arc::new(SimulatedSensor::new(config.phase_cycles));
    Arc::new(SensorReader::from_config(sensor, config))
}

async fn run_standalone(config: HeatConfig) -> anyhow::Result<()> {
    info!("heatgrid daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    let policy = FreezePolicy::from_config(&config.router).context("invalid [router] section")?;
    let registry = Arc::new(ServerRegistry::new(policy));
    info!(
        freeze = policy.freeze_threshold(),
        release = policy.release_threshold(),
        "server registry initialized"
    );

    // On-demand reader behind /live-status.
    let reader = simulated_reader(&config.sensor);
    info!(
        sensor = reader.sensor_name(),
        failsafe_hit = reader.failsafe_hit(),
        "sensor reader initialized"
    );

    let monitor = CycleMonitor::new(
        Arc::clone(&registry),
        Arc::clone(&reader),
        config.monitor.interval(),
    );
    for server_id in &config.monitor.servers {
        monitor
            .start_monitor_with(server_id, simulated_reader(&config.sensor))
            .await;
    }

    if config.server.admin_token.is_none() {
        info!("no admin token configured, reset endpoint disabled");
    }

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState {
        registry,
        reader,
        admin_token: config.server.admin_token.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    monitor.stop_all().await;

    info!("heatgrid daemon stopped");
    Ok(())
}
