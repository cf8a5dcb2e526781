//! Mailer that records every attempt, with failure injection for tests.

use crate::domain::email::OutboundEmail;
use crate::domain::errors::MailError;
use crate::ports::outbound::Mailer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Default)]
struct Recording {
    attempts: Vec<OutboundEmail>,
    delivered: Vec<OutboundEmail>,
    fail_all: bool,
    failing_recipients: HashSet<String>,
    delay: Option<Duration>,
}

/// Keeps sent emails in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    state: Mutex<Recording>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with a transport error.
    pub fn fail_all(&self) {
        self.state.lock().fail_all = true;
    }

    /// Sends to `address` fail with a transport error.
    pub fn fail_recipient(&self, address: &str) {
        self.state
            .lock()
            .failing_recipients
            .insert(address.to_string());
    }

    /// Each send waits this long first.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn attempts(&self) -> Vec<OutboundEmail> {
        self.state.lock().attempts.clone()
    }

    pub fn delivered(&self) -> Vec<OutboundEmail> {
        self.state.lock().delivered.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let (delay, fail) = {
            let mut state = self.state.lock();
            state.attempts.push(email.clone());
            let fail = state.fail_all || state.failing_recipients.contains(&email.to);
            (state.delay, fail)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(MailError::Transport(format!(
                "injected failure for {}",
                email.to
            )));
        }

        self.state.lock().delivered.push(email.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}
