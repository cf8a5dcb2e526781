//! Domain layer: validation, lifecycles, audit entries and budget rules.

pub mod audit;
pub mod budget;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod validation;
