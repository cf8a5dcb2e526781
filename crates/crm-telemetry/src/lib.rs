//! # CRM Telemetry
//!
//! Structured logging for the Lead Desk service.
//!
//! One `tracing-subscriber` registry per process:
//!
//! ```text
//! RUST_LOG (if set) ─┐
//!                    ├─► EnvFilter ─► fmt layer (JSON lines | human-readable)
//! configured level ──┘
//! ```
//!
//! Every event carries the configured `service` name through a root span
//! entered by the binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crm_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::default().with_env_overrides();
//! init_telemetry(&config)?;
//! let _root = crm_telemetry::service_span(&config).entered();
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter {
            filter: config.level.clone(),
            reason: e.to_string(),
        })
    })
}

/// Install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    if config.json {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(config.ansi);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        json = config.json,
        "Logging initialized"
    );
    Ok(())
}

/// Root span tagging every event with the service name.
pub fn service_span(config: &TelemetryConfig) -> tracing::Span {
    tracing::info_span!("service", service = %config.service_name)
}
