//! Domain layer: configuration, form results and error responses.

pub mod config;
pub mod error;
pub mod form;
