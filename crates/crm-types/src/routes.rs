//! Route table shared by the HTTP router and by outbound links.
//!
//! Templates use `:name` path parameters, which is the syntax the router
//! registers directly. [`reverse`] fills them in, so a link can only be
//! produced for a route that actually exists.

use thiserror::Error;

pub const CONTACT: &str = "/contact";
pub const CONTACT_TOKEN: &str = "/contact/token";
pub const HEALTH: &str = "/health";
pub const METRICS: &str = "/metrics";

pub const OFFICE_LEADS: &str = "/office/leads";
pub const OFFICE_LEAD: &str = "/office/leads/:id";
pub const OFFICE_LEAD_LOGS: &str = "/office/leads/:id/logs";
pub const OFFICE_LEAD_IMAGE: &str = "/office/leads/:id/images/:image_id";
pub const OFFICE_LEAD_BUDGETS: &str = "/office/leads/:id/budgets";
pub const OFFICE_BUDGET: &str = "/office/budgets/:reference";
pub const OFFICE_BUDGET_DOCUMENT: &str = "/office/budgets/:reference/document";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Missing route parameter '{param}' for {template}")]
    MissingParam {
        template: &'static str,
        param: String,
    },
    #[error("Unused route parameter '{param}' for {template}")]
    UnusedParam {
        template: &'static str,
        param: String,
    },
}

/// Fill the `:name` segments of `template` with `params`.
///
/// Values are percent-encoded as path segments. Every template parameter must
/// be supplied and every supplied parameter must be used.
pub fn reverse(template: &'static str, params: &[(&str, &str)]) -> Result<String, RouteError> {
    let mut used = vec![false; params.len()];
    let mut path = String::with_capacity(template.len() + 16);

    for segment in template.split('/').skip(1) {
        path.push('/');
        match segment.strip_prefix(':') {
            Some(name) => {
                let position = params
                    .iter()
                    .position(|(key, _)| *key == name)
                    .ok_or_else(|| RouteError::MissingParam {
                        template,
                        param: name.to_string(),
                    })?;
                used[position] = true;
                encode_segment(params[position].1, &mut path);
            }
            None => path.push_str(segment),
        }
    }

    if let Some(index) = used.iter().position(|u| !u) {
        return Err(RouteError::UnusedParam {
            template,
            param: params[index].0.to_string(),
        });
    }

    Ok(path)
}

fn encode_segment(value: &str, out: &mut String) {
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
}
