//! Ingress Healer CLI
//!
//! Watches the ingress controller deployment and restarts it after repeated
//! failed health checks. Configuration comes from the environment; the only
//! behavioural flag is `--dry-run`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ingress_healer::{KubeCluster, MonitorConfig, MonitorLoop};
use notify::Notifier;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ingress controller health monitor - restarts the deployment after repeated failed checks
#[derive(Parser)]
#[command(name = "ingress-healer")]
#[command(version)]
struct Cli {
    /// Do not take real remediation actions
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("ingress_healer=debug,notify=debug,info")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = Arc::new(
        MonitorConfig::from_env(cli.dry_run).context("Invalid monitor configuration")?,
    );

    if config.dry_run {
        info!("Running in dry-run mode: restarts will be logged, not performed");
    }

    let cluster = KubeCluster::try_default(config.label_selector.clone())
        .await
        .context("Failed to load Kubernetes configuration")?;
    let notifier = Notifier::from_config(&config.notify);

    let monitor = MonitorLoop::new(Arc::clone(&config), Arc::new(cluster), notifier);
    let shutdown = monitor.shutdown_token();
    let mut handle = tokio::spawn(monitor.run());

    tokio::select! {
        () = shutdown_signal() => {}
        joined = &mut handle => {
            // The loop only returns once stopped, so reaching this is a crash.
            joined.context("Monitor task failed")?;
            return Ok(());
        }
    }

    shutdown.cancel();

    match tokio::time::timeout(config.shutdown_grace, handle).await {
        Ok(Ok(state)) => {
            info!(
                consecutive_failures = state.consecutive_failures,
                phase = %state.phase,
                "Shutdown complete"
            );
        }
        Ok(Err(e)) => error!(error = %e, "Monitor task failed during shutdown"),
        Err(_) => warn!(
            grace_secs = config.shutdown_grace.as_secs(),
            "Monitor did not stop within the grace period, abandoning in-flight check"
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
