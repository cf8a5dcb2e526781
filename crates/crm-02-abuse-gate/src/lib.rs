//! CRM-02 Abuse Gate - first line of defence for the public contact form.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ABUSE GATE (crm-02)                    │
//! ├──────────────────────────────────────────────────────────┤
//! │  form token ──► rate limit ──► honeypot ──► fill time    │
//! │  (HMAC)         (fixed window)  (hidden field)            │
//! │                     │                                     │
//! │            ┌────────┴────────┐                            │
//! │            │ RateCounterStore│  (outbound port)           │
//! │            └────────┬────────┘                            │
//! └─────────────────────┼────────────────────────────────────┘
//!            ┌──────────┴──────────┐
//!            ▼                     ▼
//!     InMemoryCounterStore   RedisCounterStore (feature "redis")
//! ```
//!
//! # Verdicts
//!
//! - **Accept**: continue to validation and persistence
//! - **Discard**: answer exactly like a success, persist nothing (bots)
//! - **Reject**: answer with a generic "too many requests" message
//!
//! The gate runs before attachments are inspected and before any transaction
//! is opened.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{cleanup_task, InMemoryCounterStore};
#[cfg(feature = "redis")]
pub use adapters::RedisCounterStore;
pub use domain::config::{
    parse_rate, ConfigError, FormTokenConfig, GateConfig, HoneypotConfig, RateLimitConfig,
};
pub use domain::decision::{DiscardReason, GateDecision, RejectReason, SubmissionContext};
pub use domain::errors::{CounterError, TokenError};
pub use domain::form_token::{FormTokenSigner, VerifiedToken};
pub use ports::RateCounterStore;
pub use service::{AbuseGate, AbuseGateDependencies};
