//! MediSurge Daemon - crisis-response monitoring service
//!
//! Runs the monitoring loop against the reference collaborators, reporting
//! every cycle until Ctrl+C or SIGTERM.

use clap::Parser;
use medisurge_daemon::{DaemonConfig, DaemonResult, Host};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// MediSurge Daemon CLI
#[derive(Parser)]
#[command(name = "medisurged")]
#[command(about = "MediSurge Daemon - crisis-response monitoring service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MEDISURGE_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "MEDISURGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "MEDISURGE_LOG_JSON")]
    json: bool,

    /// Run a single cycle, print its summary as JSON and exit
    #[arg(long)]
    once: bool,

    /// Seed for the simulated collaborators
    #[arg(long, env = "MEDISURGE_SEED")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // CLI flags win over file and environment
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    init_tracing(&config);

    let host = Host::new(config).await?;

    if cli.once {
        let summary = host.run_once().await;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        r#"
  MediSurge - Crisis Response Orchestration
  Version: {}
  Scan interval: {}s
  Activity store: {:?}
"#,
        env!("CARGO_PKG_VERSION"),
        host.config().monitor.scan_interval_secs,
        host.config().activity,
    );

    host.run(shutdown_signal()).await
}

fn init_tracing(config: &DaemonConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
