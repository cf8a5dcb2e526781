//! Lead store configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the lead service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadStoreConfig {
    /// Prefix of budget references (`<PREFIX>-<YYYY>-<NNN>`)
    pub budget_reference_prefix: String,
    /// Maximum images per lead
    pub max_images: usize,
    /// User agents are truncated to this many characters
    pub user_agent_max_len: usize,
    /// Default page size for lead listings
    pub default_page_size: u32,
    /// Upper bound for requested page sizes
    pub max_page_size: u32,
}

impl Default for LeadStoreConfig {
    fn default() -> Self {
        Self {
            budget_reference_prefix: "PRES".to_string(),
            max_images: 5,
            user_agent_max_len: 500,
            default_page_size: 50,
            max_page_size: 200,
        }
    }
}

impl LeadStoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        let prefix = self.budget_reference_prefix.trim();
        if prefix.is_empty() {
            return Err("budget_reference_prefix cannot be empty".into());
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err("budget_reference_prefix must be alphanumeric".into());
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err("default_page_size must be between 1 and max_page_size".into());
        }
        Ok(())
    }
}
