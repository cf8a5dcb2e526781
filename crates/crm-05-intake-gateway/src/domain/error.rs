//! HTTP error responses.
//!
//! Every error body has the same shape as a contact form result:
//!
//! ```text
//! {"status":"error","message":"..."}
//! {"status":"invalid","errors":{"field":["..."]}}
//! ```
//!
//! Storage failures never leak their detail; it is logged instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_03_lead_store::StoreError;
use crm_types::FieldErrors;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Generic message for rate-limited submissions. Carries no quota detail.
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many requests. Please try again later or contact us by phone.";

/// Generic message for failed or missing form tokens.
pub const FORBIDDEN_MESSAGE: &str = "The form has expired. Please reload the page and try again.";

/// Generic message for failures on our side.
pub const INTERNAL_MESSAGE: &str =
    "We could not process your request right now. Please try again later or contact us by phone.";

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ErrorBody {
    Error { message: String },
    Invalid { errors: FieldErrors },
}

/// Gateway error with an HTTP status
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Error {
                message: message.into(),
            },
        }
    }

    /// Field-level validation failure
    pub fn invalid(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorBody::Invalid { errors },
        }
    }

    /// Malformed request (unparseable body, bad path parameter)
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, details)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required.")
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, details)
    }

    /// Missing or invalid form token
    pub fn form_expired() -> Self {
        Self::new(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{} not found.", resource.into()),
        )
    }

    pub fn conflict(details: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, details)
    }

    pub fn rate_limited() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE)
    }

    /// Generic failure. Callers log the detail first.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, details)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ErrorBody::Error { message } => write!(f, "[{}] {}", self.status.as_u16(), message),
            ErrorBody::Invalid { errors } => write!(f, "[{}] {}", self.status.as_u16(), errors),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(errors) => {
                debug!(%errors, "Request failed validation");
                ApiError::invalid(errors)
            }
            StoreError::NotFound { entity, .. } => ApiError::not_found(capitalize(entity)),
            StoreError::InvalidTransition { .. } => ApiError::conflict(e.to_string()),
            StoreError::Forbidden(reason) => ApiError::forbidden(reason),
            StoreError::Storage(detail) => {
                error!(error = %detail, "Storage failure");
                ApiError::internal()
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Gateway start-up errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway config: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
