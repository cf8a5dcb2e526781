//! # Notifications (crm-04)
//!
//! Best-effort email side effects of committed lead events.
//!
//! ## Architecture
//!
//! ```text
//!   committed LeadEvent
//!           │
//!           ▼
//!   PostCommitHooks::dispatch
//!     ┌─────┼───────────────┬──────────────┐
//!     ▼     ▼               ▼              ▼
//!  admin  customer      assignment     note_alert     one task each,
//!  alert  ack                                         own timeout
//!     └─────┴───────┬───────┴──────────────┘
//!                   ▼
//!         Mailer (outbound port)
//!      ┌────────────┼──────────────┐
//!      ▼            ▼              ▼
//!  SmtpMailer   LogMailer   RecordingMailer
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Description |
//! |-----------|-------------|
//! | After commit | Hooks only see events whose data already committed |
//! | Isolation | One hook failing, hanging or panicking never affects another |
//! | Non-blocking | Callers spawn the dispatch and never wait for delivery |
//! | Escaped HTML | Lead values are escaped before they reach an HTML body |
//! | Valid links | Links are reversed from the shared route table |

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod dispatcher;
pub mod domain;
pub mod hooks;
pub mod ports;

pub use adapters::{LogMailer, RecordingMailer, SmtpMailer};
pub use dispatcher::PostCommitHooks;
pub use domain::config::{NotificationConfig, SmtpConfig, SmtpTls};
pub use domain::email::OutboundEmail;
pub use domain::errors::{ConfigError, LinkError, MailError};
pub use domain::events::LeadEvent;
pub use domain::links::LinkBuilder;
pub use domain::report::{HookOutcome, NotificationReport};
pub use hooks::{AdminAlertHook, AssignmentHook, CustomerAckHook, NoteAlertHook};
pub use ports::{HookStatus, Mailer, PostCommitHook};

use std::sync::Arc;

/// The mailer for a configuration: SMTP when a relay is configured, logging otherwise.
pub fn mailer_from_config(config: &NotificationConfig) -> Result<Arc<dyn Mailer>, ConfigError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}
