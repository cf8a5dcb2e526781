//! Abuse gate configuration.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Complete abuse gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub rate_limit: RateLimitConfig,
    pub honeypot: HoneypotConfig,
    pub form_token: FormTokenConfig,
}

impl GateConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled {
            if self.rate_limit.max_submissions == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "max_submissions cannot be 0".into(),
                ));
            }
            if self.rate_limit.window < Duration::from_secs(1) {
                return Err(ConfigError::InvalidRateLimit(
                    "window must be at least one second".into(),
                ));
            }
        }

        if self.honeypot.enabled && self.honeypot.field_name.trim().is_empty() {
            return Err(ConfigError::InvalidHoneypot(
                "field_name cannot be empty".into(),
            ));
        }

        if self.form_token.enabled {
            if self.form_token.max_age.is_zero() {
                return Err(ConfigError::InvalidFormToken("max_age cannot be 0".into()));
            }
            if let Some(secret) = &self.form_token.secret {
                if secret.len() < MIN_SECRET_LEN {
                    return Err(ConfigError::InvalidFormToken(format!(
                        "secret must be at least {} bytes",
                        MIN_SECRET_LEN
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Shortest accepted form-token secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Per-IP submission limit (fixed window).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Submissions allowed per window
    pub max_submissions: u32,
    /// Window length
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// IPs that bypass the limit
    pub whitelist: Vec<IpAddr>,
    /// Namespace for counter keys
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_submissions: 5,
            window: Duration::from_secs(3600),
            whitelist: Vec::new(),
            key_prefix: "contact".to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Apply a compact rate such as `5/h`, `20/m` or `100/d`.
    pub fn apply_rate(&mut self, rate: &str) -> Result<(), ConfigError> {
        let (count, window) = parse_rate(rate)?;
        self.max_submissions = count;
        self.window = window;
        Ok(())
    }
}

/// Parse `<count>/<unit>` where unit is `s`, `m`, `h` or `d`.
pub fn parse_rate(rate: &str) -> Result<(u32, Duration), ConfigError> {
    let invalid = || ConfigError::InvalidRateLimit(format!("cannot parse rate '{}'", rate));
    let (count, unit) = rate.trim().split_once('/').ok_or_else(invalid)?;
    let count: u32 = count.trim().parse().map_err(|_| invalid())?;
    let seconds = match unit.trim() {
        "s" | "sec" | "second" => 1,
        "m" | "min" | "minute" => 60,
        "h" | "hour" => 3600,
        "d" | "day" => 86_400,
        _ => return Err(invalid()),
    };
    if count == 0 {
        return Err(invalid());
    }
    Ok((count, Duration::from_secs(seconds)))
}

/// Hidden-field bot trap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneypotConfig {
    pub enabled: bool,
    /// Name of the field that must arrive empty
    pub field_name: String,
    /// Submissions faster than this after the form token was issued are
    /// treated as automated. Zero disables the check.
    #[serde(with = "humantime_serde")]
    pub min_fill_time: Duration,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            field_name: "website_url".to_string(),
            min_fill_time: Duration::ZERO,
        }
    }
}

/// Signed form tokens (CSRF protection for the public form).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormTokenConfig {
    pub enabled: bool,
    /// HMAC key. A random key is generated at start-up when absent, which
    /// invalidates outstanding tokens on restart.
    pub secret: Option<String>,
    /// Maximum token age
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for FormTokenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret: None,
            max_age: Duration::from_secs(2 * 3600),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("invalid honeypot: {0}")]
    InvalidHoneypot(String),
    #[error("invalid form token: {0}")]
    InvalidFormToken(String),
}
