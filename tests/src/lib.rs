//! # Lead Desk Test Suite
//!
//! Cross-crate flows over the real SQLite adapter.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs        # Stack fixture, multipart builder, HTTP helpers
//!     ├── intake_flows.rs   # Contact form → gate → files → store → hooks
//!     ├── office_flows.rs   # Back-office API: status, audit, budgets
//!     └── runtime_flows.rs  # Container wiring, restart, TCP serving
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p crm-tests
//!
//! # By flow
//! cargo test -p crm-tests integration::intake_flows
//! cargo test -p crm-tests integration::office_flows
//! ```

pub mod integration;
