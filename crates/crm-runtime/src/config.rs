//! # Runtime Configuration
//!
//! One TOML file covers every crate; each section deserializes straight into
//! the owning crate's config type, so a missing section means defaults.
//!
//! ```toml
//! [gateway.http]      # bind address, limits, timeouts, proxies, CORS
//! [abuse_gate]        # rate limit, honeypot, form tokens
//! [attachments]       # photo count, size and formats
//! [documents]         # budget PDF size
//! [lead_store]        # budget reference prefix, page sizes
//! [notifications]     # admin address, toggles, origin, SMTP relay
//! [database]          # SQLite path
//! [redis]             # optional shared counter store
//! [log]               # level, JSON output
//! [[staff]]           # back-office accounts and their tokens
//! [[services]]        # service catalogue
//! ```
//!
//! Secrets are normally supplied through the environment instead:
//!
//! | Variable            | Overrides                          |
//! |---------------------|------------------------------------|
//! | `CRM_CSRF_SECRET`   | `abuse_gate.form_token.secret`     |
//! | `CRM_SMTP_PASSWORD` | `notifications.smtp.password`      |
//! | `CRM_DATABASE_PATH` | `database.path`                    |
//! | `CRM_REDIS_URL`     | `redis.url`                        |
//! | `CRM_LOG_LEVEL`     | `log.level`                        |

use anyhow::{bail, Context, Result};
use crm_01_file_integrity::{AttachmentPolicy, DocumentPolicy};
use crm_02_abuse_gate::GateConfig;
use crm_03_lead_store::LeadStoreConfig;
use crm_04_notifications::NotificationConfig;
use crm_05_intake_gateway::GatewayConfig;
use crm_telemetry::TelemetryConfig;
use crm_types::{Role, ServiceCategory, StaffId, StaffMember};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest accepted staff token.
pub const MIN_STAFF_TOKEN_LEN: usize = 16;

/// Complete service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub gateway: GatewayConfig,
    pub abuse_gate: GateConfig,
    pub attachments: AttachmentPolicy,
    pub documents: DocumentPolicy,
    pub lead_store: LeadStoreConfig,
    pub notifications: NotificationConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub log: TelemetryConfig,
    pub staff: Vec<StaffEntry>,
    pub services: Vec<ServiceCategory>,
}

/// SQLite settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/leads.sqlite3"),
        }
    }
}

/// Rate-limit counter store. In-process when `url` is unset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: Option<String>,
    /// Per-command timeout
    #[serde(with = "humantime_serde")]
    pub op_timeout: Duration,
    /// Eviction interval of the in-process store
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            op_timeout: Duration::from_millis(500),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// A back-office account with its access token.
#[derive(Clone, Deserialize)]
pub struct StaffEntry {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    pub token: String,
}

fn default_active() -> bool {
    true
}

impl std::fmt::Debug for StaffEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaffEntry")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl StaffEntry {
    pub fn member(&self) -> StaffMember {
        StaffMember {
            id: StaffId(self.id),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            active: self.active,
        }
    }
}

impl RuntimeConfig {
    /// Read `path`, or start from defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `CRM_*` overrides read through `var`.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(secret) = var("CRM_CSRF_SECRET") {
            self.abuse_gate.form_token.secret = Some(secret);
        }
        if let Some(password) = var("CRM_SMTP_PASSWORD") {
            if let Some(smtp) = self.notifications.smtp.as_mut() {
                smtp.password = Some(password);
            }
        }
        if let Some(path) = var("CRM_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(url) = var("CRM_REDIS_URL") {
            self.redis.url = Some(url);
        }
        if let Some(level) = var("CRM_LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// Check every section before anything is opened or bound.
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate().context("[gateway]")?;
        self.abuse_gate.validate().context("[abuse_gate]")?;
        self.notifications.validate().context("[notifications]")?;
        self.lead_store
            .validate()
            .map_err(anyhow::Error::msg)
            .context("[lead_store]")?;

        if self.attachments.max_count == 0 || self.attachments.max_size_bytes == 0 {
            bail!("[attachments] max_count and max_size_bytes must be greater than zero");
        }
        if self.attachments.allowed_formats.is_empty() {
            bail!("[attachments] allowed_formats cannot be empty");
        }
        if self.attachments.max_count > self.lead_store.max_images {
            bail!(
                "[attachments] max_count ({}) exceeds lead_store.max_images ({})",
                self.attachments.max_count,
                self.lead_store.max_images
            );
        }
        if self.documents.max_size_bytes == 0 {
            bail!("[documents] max_size_bytes must be greater than zero");
        }

        let mut ids = HashSet::new();
        let mut tokens = HashSet::new();
        for entry in &self.staff {
            if !ids.insert(entry.id) {
                bail!("[[staff]] duplicate id {}", entry.id);
            }
            if entry.token.len() < MIN_STAFF_TOKEN_LEN {
                bail!(
                    "[[staff]] token of '{}' must be at least {} characters",
                    entry.username,
                    MIN_STAFF_TOKEN_LEN
                );
            }
            if !tokens.insert(entry.token.as_str()) {
                bail!("[[staff]] token of '{}' is not unique", entry.username);
            }
        }

        let mut service_ids = HashSet::new();
        for service in &self.services {
            if !service_ids.insert(service.id) {
                bail!("[[services]] duplicate id {}", service.id);
            }
        }
        Ok(())
    }
}
