//! Domain layer for attachment validation.

pub mod errors;
pub mod policy;
pub mod signature;
