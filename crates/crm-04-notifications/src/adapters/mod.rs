//! Mailer adapters.

pub mod log;
pub mod recording;
pub mod smtp;

pub use self::log::LogMailer;
pub use recording::RecordingMailer;
pub use smtp::SmtpMailer;
