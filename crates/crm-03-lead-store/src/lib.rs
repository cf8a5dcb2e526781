//! # Lead Store (crm-03)
//!
//! Transactional persistence of leads, their images, budgets and the audit
//! trail.
//!
//! ## Architecture
//!
//! ```text
//!  intake gateway / back office
//!              │
//!              ▼
//!   LeadManagementApi (inbound port)
//!              │
//!        LeadService ── validation, lifecycles, audit entries
//!              │
//!   LeadStore::with_transaction (outbound port)
//!        ┌─────┴──────┐
//!        ▼            ▼
//!  SqliteLeadStore  InMemoryLeadStore
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Atomic capture | A lead, its images and its creation entry commit together |
//! | One entry per commit | Every committed change writes exactly one audit entry |
//! | Append-only audit | Logs are never updated or deleted |
//! | Monotonic status | A lead never returns to `new`; terminal states are final |
//! | Budget numbering | `<PREFIX>-<YYYY>-<NNN>`, sequential per year |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Validation, lifecycles, audit entries, budget rules
//! - `ports/` - Inbound API and the transactional storage port
//! - `service/` - `LeadService`, the single mutation path
//! - `adapters/` - SQLite and in-memory stores

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{Fault, InMemoryLeadStore, SqliteLeadStore};
pub use domain::audit::{LeadChange, LeadUpdate};
pub use domain::budget::BudgetDraft;
pub use domain::config::LeadStoreConfig;
pub use domain::errors::StoreError;
pub use domain::lifecycle::{check_budget_transition, check_lead_transition, Transition};
pub use domain::validation::{ContactDetails, ContactForm};
pub use ports::inbound::{
    ClientInfo, CreatedLead, LeadDetail, LeadManagementApi, LeadPage, LeadUpdateOutcome,
    ListQuery, NewLead,
};
pub use ports::outbound::{LeadFilter, LeadStore, LeadTransaction, NewImageRecord};
pub use service::{LeadService, LeadServiceDependencies};
