//! # Lead Desk Runtime Library
//!
//! Configuration loading and service wiring for the `lead-desk` binary,
//! exposed as a library for tests.
//!
//! ## Startup Sequence
//!
//! 1. Parse CLI arguments, initialize logging
//! 2. Load the TOML file, apply `CRM_*` environment overrides
//! 3. Validate every section
//! 4. Open the database, seed staff and services
//! 5. Build the abuse gate, hooks and intake pipeline
//! 6. Serve HTTP until Ctrl+C or SIGTERM

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod container;

pub use config::RuntimeConfig;
pub use container::ServiceContainer;
