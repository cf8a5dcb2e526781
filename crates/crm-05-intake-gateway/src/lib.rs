// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! CRM-05 Intake Gateway - public contact endpoint and back-office API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                         INTAKE GATEWAY (crm-05)                              │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐               │
//! │  │ /contact     │  │ /office/...      │  │ /health /metrics │               │
//! │  │ multipart    │  │ JSON, staff auth │  │                  │               │
//! │  └──────┬───────┘  └────────┬─────────┘  └──────────────────┘               │
//! │         │                   │                                               │
//! │  ┌──────┴───────────────────┴─────────────────────┐                         │
//! │  │              Middleware Stack                   │                         │
//! │  │  Tracing → IpProtection → Timeout → CORS       │                         │
//! │  └──────┬───────────────────┬─────────────────────┘                         │
//! │         │                   │                                               │
//! │  ┌──────┴───────┐           │                                               │
//! │  │   Intake     │           │                                               │
//! │  │   Pipeline   │           │                                               │
//! │  └──────┬───────┘           │                                               │
//! └─────────┼───────────────────┼───────────────────────────────────────────────┘
//!           │                   │
//!     ┌─────┴─────┬─────────────┼──────────────┐
//!     ▼           ▼             ▼              ▼
//! crm-02-gate  crm-01-files  crm-03-store  crm-04-notifications
//! ```
//!
//! # Contact responses
//!
//! | Outcome        | Status | Body                                   |
//! |----------------|--------|----------------------------------------|
//! | Accepted       | 200    | `{"status":"ok","message":...}`        |
//! | Honeypot       | 200    | identical to Accepted                  |
//! | Invalid        | 422    | `{"status":"invalid","errors":{...}}`  |
//! | Rate limited   | 429    | generic message                        |
//! | Token failure  | 403    | generic message                        |
//! | Storage error  | 500    | generic message                        |
//!
//! # Usage
//!
//! ```ignore
//! use crm_05_intake_gateway::{IntakeGatewayService, GatewayConfig};
//!
//! let service = IntakeGatewayService::new(config, state, staff)?;
//! service.start(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod service;

#[cfg(test)]
mod test_support;

// Re-exports for public API
pub use domain::config::{
    ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig, SecurityConfig,
    TimeoutConfig,
};
pub use domain::error::{ApiError, ErrorBody, GatewayError};
pub use domain::form::{ContactSubmission, FormAccepted, FormTokenResponse};
pub use middleware::{IntakeMetrics, MetricsSnapshot, StaffDirectory};
pub use pipeline::{ContactOutcome, IntakePipeline, IntakePipelineDependencies};
pub use router::{build_router, AppState};
pub use service::{serve, IntakeGatewayService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
