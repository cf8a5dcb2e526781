//! Contact form submissions and the results rendered for them.

use crm_01_file_integrity::AttachmentInput;
use crm_03_lead_store::ContactForm;
use serde::Serialize;
use std::net::IpAddr;

/// Multipart field carrying image attachments.
pub const PHOTOS_FIELD: &str = "photos";

/// Form field carrying the CSRF form token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Header alternative to [`CSRF_FIELD`].
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Shown for accepted and silently discarded submissions alike.
pub const SUCCESS_MESSAGE: &str =
    "Thank you for contacting us. We have received your request and will get back to you shortly.";

/// A parsed contact form submission.
#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub form: ContactForm,
    /// Value of the honeypot field, if present
    pub honeypot: Option<String>,
    pub csrf_token: Option<String>,
    pub attachments: Vec<AttachmentInput>,
    pub ip: IpAddr,
    pub user_agent: Option<String>,
}

/// `{"status":"ok","message":"..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormAccepted {
    pub status: &'static str,
    pub message: &'static str,
}

impl FormAccepted {
    pub fn new() -> Self {
        Self {
            status: "ok",
            message: SUCCESS_MESSAGE,
        }
    }
}

impl Default for FormAccepted {
    fn default() -> Self {
        Self::new()
    }
}

/// Response of `GET /contact/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormTokenResponse {
    /// `None` when form tokens are disabled
    pub csrf_token: Option<String>,
    pub honeypot_field: String,
}

/// Checkbox semantics of HTML forms.
pub fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}
