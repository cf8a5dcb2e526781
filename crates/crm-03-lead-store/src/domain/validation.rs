//! Contact field validation.
//!
//! Turns the raw strings of a contact form into `ContactDetails`. Every field
//! is checked and all messages are collected, so the form can show them at
//! once.

use crm_types::{ContactChannel, FieldErrors, ServiceId, Urgency};
use serde::Deserialize;

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 254;
pub const PHONE_DIGITS_MIN: usize = 9;
pub const PHONE_DIGITS_MAX: usize = 15;
pub const MESSAGE_MIN: usize = 20;
pub const MESSAGE_MAX: usize = 1000;
pub const LOCATION_MAX: usize = 200;

/// Raw contact form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub message: String,
    /// Service catalogue id, empty when not chosen
    pub service: String,
    pub urgency: String,
    pub preferred_contact: String,
    pub privacy_accepted: bool,
}

/// Contact fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub message: String,
    pub service_id: Option<ServiceId>,
    pub urgency: Urgency,
    pub preferred_contact: ContactChannel,
    pub privacy_accepted: bool,
}

impl ContactForm {
    /// Validate every field, collecting all messages.
    pub fn validate(&self) -> Result<ContactDetails, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = check_name(&self.name).map_err(|m| errors.add("name", m)).ok();
        let email = check_email(&self.email)
            .map_err(|m| errors.add("email", m))
            .ok()
            .flatten();
        let phone = check_phone(&self.phone)
            .map_err(|m| errors.add("phone", m))
            .ok()
            .flatten();
        let message = check_message(&self.message)
            .map_err(|m| errors.add("message", m))
            .ok();

        let location = non_empty(&self.location);
        if location
            .as_ref()
            .is_some_and(|l| l.chars().count() > LOCATION_MAX)
        {
            errors.add(
                "location",
                format!("Location cannot exceed {} characters.", LOCATION_MAX),
            );
        }

        let service_id = match non_empty(&self.service) {
            None => None,
            Some(raw) => match raw.parse::<ServiceId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("service", "Select a valid service.");
                    None
                }
            },
        };

        let urgency = match non_empty(&self.urgency) {
            None => Urgency::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                errors.add("urgency", "Select a valid urgency.");
                Urgency::default()
            }),
        };

        let preferred_contact = match non_empty(&self.preferred_contact) {
            None => ContactChannel::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                errors.add("preferred_contact", "Select a valid contact method.");
                ContactChannel::default()
            }),
        };

        let email_ok = !errors.contains("email");
        let phone_ok = !errors.contains("phone");
        if email_ok && phone_ok && email.is_none() && phone.is_none() {
            errors.add(
                FieldErrors::NON_FIELD,
                "Provide an email address or a phone number.",
            );
        }
        if phone_ok
            && phone.is_none()
            && matches!(
                preferred_contact,
                ContactChannel::Phone | ContactChannel::Whatsapp
            )
        {
            errors.add(
                "preferred_contact",
                "A phone number is required for this contact method.",
            );
        }
        if email_ok
            && email.is_none()
            && phone.is_some()
            && preferred_contact == ContactChannel::Email
            && non_empty(&self.preferred_contact).is_some()
        {
            errors.add(
                "preferred_contact",
                "An email address is required for this contact method.",
            );
        }

        // Phone-only submitters default to being called back.
        let preferred_contact = if email.is_none() && phone.is_some() {
            match preferred_contact {
                ContactChannel::Email => ContactChannel::Phone,
                other => other,
            }
        } else {
            preferred_contact
        };

        match (name, message) {
            (Some(name), Some(message)) if errors.is_empty() => Ok(ContactDetails {
                name,
                email,
                phone,
                location,
                message,
                service_id,
                urgency,
                preferred_contact,
                privacy_accepted: self.privacy_accepted,
            }),
            _ => Err(errors),
        }
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn check_name(raw: &str) -> Result<String, String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let length = name.chars().count();
    if length == 0 {
        return Err("Name is required.".into());
    }
    if length < NAME_MIN {
        return Err(format!("Name must be at least {} characters.", NAME_MIN));
    }
    if length > NAME_MAX {
        return Err(format!("Name cannot exceed {} characters.", NAME_MAX));
    }
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-' || c == '.')
    {
        return Err("Name can only contain letters and spaces.".into());
    }
    Ok(name)
}

fn check_email(raw: &str) -> Result<Option<String>, String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Ok(None);
    }
    if email.chars().count() > EMAIL_MAX {
        return Err("Email address is too long.".into());
    }
    if !is_plausible_email(&email) {
        return Err("Enter a valid email address.".into());
    }
    Ok(Some(email))
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || local.contains('@') {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

fn check_phone(raw: &str) -> Result<Option<String>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };
    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number can only contain digits.".into());
    }
    if !(PHONE_DIGITS_MIN..=PHONE_DIGITS_MAX).contains(&digits.len()) {
        return Err(format!(
            "Phone number must have between {} and {} digits.",
            PHONE_DIGITS_MIN, PHONE_DIGITS_MAX
        ));
    }
    Ok(Some(format!("{}{}", plus, digits)))
}

fn check_message(raw: &str) -> Result<String, String> {
    let message = raw.trim();
    let length = message.chars().count();
    if length == 0 {
        return Err("Please describe what you need.".into());
    }
    if length < MESSAGE_MIN {
        return Err(format!(
            "Message must be at least {} characters.",
            MESSAGE_MIN
        ));
    }
    if length > MESSAGE_MAX {
        return Err(format!("Message cannot exceed {} characters.", MESSAGE_MAX));
    }
    Ok(message.to_string())
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
