//! Domain layer: events, email bodies, links and configuration.

pub mod config;
pub mod email;
pub mod errors;
pub mod events;
pub mod links;
pub mod report;
pub mod templates;
