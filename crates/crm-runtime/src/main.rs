//! # Lead Desk
//!
//! Serves the public contact form and the back-office lead API.
//!
//! ```text
//! lead-desk --config /etc/lead-desk/lead-desk.toml
//! lead-desk --config lead-desk.toml --check
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Instrument};

use crm_runtime::{RuntimeConfig, ServiceContainer};

/// Lead Desk: contact intake and lead management service
#[derive(Parser, Debug)]
#[command(name = "lead-desk", version)]
#[command(about = "Contact intake and lead management service")]
struct Args {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long, env = "CRM_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok());
    config.log = config.log.clone().with_env_overrides();

    crm_telemetry::init_telemetry(&config.log)?;
    let root = crm_telemetry::service_span(&config.log);
    run(args, config).instrument(root).await
}

async fn run(args: Args, config: RuntimeConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    if args.check {
        info!("Configuration OK");
        return Ok(());
    }
    if args.config.is_none() {
        warn!("No configuration file given; running with defaults");
    }

    info!(
        version = crm_05_intake_gateway::VERSION,
        database = %config.database.path.display(),
        "Starting Lead Desk"
    );

    let container = ServiceContainer::build(&config).await?;
    let gateway = container.gateway(&config)?;
    gateway.start(shutdown_signal()).await?;

    if let Some(cleanup) = container.cleanup {
        cleanup.abort();
    }
    info!("Lead Desk stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
