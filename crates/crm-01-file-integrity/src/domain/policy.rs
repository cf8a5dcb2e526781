//! Limits applied to uploads.

use crm_types::ImageFormat;
use serde::{Deserialize, Serialize};

/// 1 MiB.
pub const MIB: u64 = 1024 * 1024;

/// Limits for images attached to a contact submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentPolicy {
    /// Maximum number of files per submission.
    pub max_count: usize,
    /// Maximum size of a single file in bytes.
    pub max_size_bytes: u64,
    /// Formats accepted after signature inspection.
    pub allowed_formats: Vec<ImageFormat>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_count: 5,
            max_size_bytes: 5 * MIB,
            allowed_formats: vec![ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp],
        }
    }
}

impl AttachmentPolicy {
    pub fn allows(&self, format: ImageFormat) -> bool {
        self.allowed_formats.contains(&format)
    }

    /// Human list of accepted formats, e.g. "JPEG, PNG, WEBP".
    pub fn allowed_list(&self) -> String {
        self.allowed_formats
            .iter()
            .map(|f| f.as_str().to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Limits for the PDF document attached to a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPolicy {
    pub max_size_bytes: u64,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * MIB,
        }
    }
}
