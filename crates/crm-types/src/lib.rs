//! # CRM Shared Types Crate
//!
//! This crate contains the domain entities exchanged between the intake
//! pipeline crates, the field-error mapping rendered by the contact form and
//! the route table used both by the HTTP gateway and by outbound email links.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type crossing a crate boundary lives here.
//! - **Closed Vocabularies**: Statuses, channels and roles are enums with a
//!   stable lowercase wire form, never free strings.
//! - **One Route Table**: Paths are declared once in [`routes`] and reversed
//!   from there, so links in emails can never drift from the router.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod money;
pub mod routes;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::*;
pub use errors::*;
pub use money::Money;
