//! Notification configuration.

use crate::domain::errors::ConfigError;
use crate::domain::links::LinkBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Configuration for post-commit notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch for every hook
    pub enabled: bool,
    /// Recipient of new-lead and note alerts; alerts are skipped when unset
    pub admin_email: Option<String>,
    /// Acknowledge the submission to the customer
    pub send_customer_confirmation: bool,
    /// Tell staff members when a lead is assigned to them
    pub notify_assignee: bool,
    /// Tell the admin address when a note is added
    pub notify_notes: bool,
    /// Origin every back-office link is built on
    pub public_origin: String,
    /// Name used in customer-facing emails
    pub business_name: String,
    /// Time budget of a single hook
    #[serde(with = "humantime_serde")]
    pub hook_timeout: Duration,
    /// SMTP relay; emails are only logged when absent
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_email: None,
            send_customer_confirmation: true,
            notify_assignee: true,
            notify_notes: true,
            public_origin: "http://localhost:8080".to_string(),
            business_name: "Lead Desk".to_string(),
            hook_timeout: Duration::from_secs(10),
            smtp: None,
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hook_timeout.is_zero() {
            return Err(ConfigError::Notifications(
                "hook_timeout must be greater than zero".into(),
            ));
        }
        if let Some(admin) = &self.admin_email {
            if !admin.contains('@') {
                return Err(ConfigError::Notifications(format!(
                    "admin_email '{}' is not an email address",
                    admin
                )));
            }
        }
        LinkBuilder::parse(&self.public_origin)
            .map_err(|e| ConfigError::Notifications(e.to_string()))?;
        if let Some(smtp) = &self.smtp {
            smtp.validate()?;
        }
        Ok(())
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS (port 587)
    #[default]
    Starttls,
    /// Implicit TLS (port 465)
    Tls,
    /// No encryption; local relays only
    #[serde(rename = "none")]
    Plain,
}

/// SMTP relay settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: Option<String>,
    /// Usually supplied through the environment
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Sender mailbox, e.g. `Lead Desk <no-reply@example.com>`
    pub from: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            tls: SmtpTls::Starttls,
            username: None,
            password: None,
            from: "Lead Desk <no-reply@localhost>".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SmtpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Smtp("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Smtp("port cannot be 0".into()));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::Smtp(
                "username and password must be set together".into(),
            ));
        }
        if !self.from.contains('@') {
            return Err(ConfigError::Smtp(format!(
                "from '{}' is not a mailbox",
                self.from
            )));
        }
        Ok(())
    }
}
