//! # Lead Store Errors
//!
//! Two families matter to callers:
//!
//! - **Bad input** (`Validation`, `InvalidTransition`, `NotFound`,
//!   `Forbidden`): rendered to the user, never logged as failures.
//! - **Storage failure** (`Storage`): rendered generically, logged with
//!   detail, the transaction is rolled back.

use crm_types::FieldErrors;
use thiserror::Error;

/// Errors that can occur in the lead store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Input failed field validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Entity not found.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Status change not permitted by the lifecycle.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The acting staff member may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Database operation failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        StoreError::Validation(FieldErrors::single(field, message))
    }

    /// True for errors caused by the caller rather than the backend.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StoreError::Storage(_))
    }
}

impl From<FieldErrors> for StoreError {
    fn from(errors: FieldErrors) -> Self {
        StoreError::Validation(errors)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
