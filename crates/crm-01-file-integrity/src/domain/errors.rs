//! Validation failures. Display strings are shown to the submitter.

use crm_types::{FieldErrors, ImageFormat};
use thiserror::Error;

/// Why a single image was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("The file is empty.")]
    Empty,

    #[error("The file is too large ({size} bytes). The maximum is {limit} bytes.")]
    TooLarge { size: u64, limit: u64 },

    #[error("The file is not a valid image.")]
    UnrecognizedSignature,

    /// RIFF container whose form tag is not WEBP.
    #[error("The file is not a valid WEBP image.")]
    ForeignRiff,

    #[error("Image format {0} is not accepted.")]
    FormatNotAllowed(ImageFormat),

    #[error("The file content ({detected}) does not match its declared type ({declared}).")]
    TypeMismatch {
        declared: ImageFormat,
        detected: ImageFormat,
    },

    #[error("Files of type {0} are not accepted.")]
    UnsupportedDeclaredType(String),
}

/// Why a batch of images was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("You can attach at most {max} images ({count} sent).")]
    TooMany { count: usize, max: usize },

    #[error("{file_name}: {source}")]
    Invalid {
        index: usize,
        file_name: String,
        #[source]
        source: AttachmentError,
    },
}

impl BatchError {
    /// Render under a single form field.
    pub fn to_field_errors(&self, field: &str) -> FieldErrors {
        FieldErrors::single(field, self.to_string())
    }
}

/// Why a budget document was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("The document is empty.")]
    Empty,

    #[error("The document is too large ({size} bytes). The maximum is {limit} bytes.")]
    TooLarge { size: u64, limit: u64 },

    #[error("The document is not a valid PDF.")]
    NotPdf,
}
