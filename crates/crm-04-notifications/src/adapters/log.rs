//! Mailer that only logs, used when no SMTP relay is configured.

use crate::domain::email::OutboundEmail;
use crate::domain::errors::MailError;
use crate::ports::outbound::Mailer;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            bytes = email.text_body.len(),
            "Email not sent (no SMTP relay configured)"
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "log"
    }
}
