//! Domain layer: configuration, verdicts, window arithmetic and form tokens.

pub mod config;
pub mod decision;
pub mod errors;
pub mod form_token;
pub mod window;
