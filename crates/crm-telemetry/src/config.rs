//! Logging configuration.

use serde::Deserialize;
use std::env;

/// Configuration for structured logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name tagged on every event
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full directive list
    pub level: String,

    /// JSON lines instead of human-readable output
    pub json: bool,

    /// Whether to colour human-readable output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "lead-desk".to_string(),
            level: "info".to_string(),
            json: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Apply environment overrides.
    ///
    /// # Environment Variables
    ///
    /// - `CRM_LOG_LEVEL`: Log level (`RUST_LOG` still wins at filter time)
    /// - `CRM_JSON_LOGS`: `true`/`1` for JSON output (default: on in containers)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = env::var("CRM_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.level = level;
            }
        }

        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        match env::var("CRM_JSON_LOGS") {
            Ok(v) => self.json = v.eq_ignore_ascii_case("true") || v == "1",
            Err(_) if is_container => self.json = true,
            Err(_) => {}
        }
        self
    }
}
