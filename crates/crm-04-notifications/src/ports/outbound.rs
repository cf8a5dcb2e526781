//! # Outbound Ports (Driven Ports)
//!
//! Production: `SmtpMailer`
//! Without SMTP: `LogMailer`
//! Testing: `RecordingMailer` (with failure injection)

use crate::domain::email::OutboundEmail;
use crate::domain::errors::MailError;
use async_trait::async_trait;

/// Delivers one email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;

    /// Adapter name for logs.
    fn backend(&self) -> &'static str;
}
