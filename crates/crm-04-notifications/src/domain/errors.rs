//! Notification errors.

use crm_types::routes::RouteError;
use thiserror::Error;

/// Errors while building or delivering an email.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("could not build link: {0}")]
    Link(#[from] LinkError),
}

/// Errors while producing an absolute back-office link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("public origin must be an absolute http(s) URL: {0}")]
    InvalidOrigin(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("could not join path onto origin: {0}")]
    Join(String),
}

/// Invalid notification configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid notification config: {0}")]
    Notifications(String),

    #[error("invalid SMTP config: {0}")]
    Smtp(String),
}
