//! Attachment and document validation.
//!
//! Checks run cheapest-first: count, emptiness, size, then signature. A
//! rejected upload never reaches the store.

use crate::domain::errors::{AttachmentError, BatchError, DocumentError};
use crate::domain::policy::{AttachmentPolicy, DocumentPolicy};
use crate::domain::signature::{is_foreign_riff, sniff_image, DeclaredType, PDF_MAGIC};
use crm_types::ImageFormat;
use tracing::debug;

/// An upload as received from the client.
#[derive(Debug, Clone)]
pub struct AttachmentInput {
    pub file_name: String,
    pub declared: DeclaredType,
    pub bytes: Vec<u8>,
}

/// An upload whose content has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAttachment {
    pub file_name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Validate one image buffer against the declared type and policy.
///
/// Returns the format detected from the content.
pub fn validate_attachment(
    bytes: &[u8],
    declared: &DeclaredType,
    policy: &AttachmentPolicy,
) -> Result<ImageFormat, AttachmentError> {
    if let DeclaredType::Other(content_type) = declared {
        return Err(AttachmentError::UnsupportedDeclaredType(content_type.clone()));
    }

    if bytes.is_empty() {
        return Err(AttachmentError::Empty);
    }

    let size = bytes.len() as u64;
    if size > policy.max_size_bytes {
        return Err(AttachmentError::TooLarge {
            size,
            limit: policy.max_size_bytes,
        });
    }

    let detected = match sniff_image(bytes) {
        Some(format) => format,
        None if is_foreign_riff(bytes) => return Err(AttachmentError::ForeignRiff),
        None => return Err(AttachmentError::UnrecognizedSignature),
    };

    if !policy.allows(detected) {
        return Err(AttachmentError::FormatNotAllowed(detected));
    }

    if let DeclaredType::Image(claimed) = declared {
        if *claimed != detected {
            return Err(AttachmentError::TypeMismatch {
                declared: *claimed,
                detected,
            });
        }
    }

    Ok(detected)
}

/// Validate all images of a submission. Fails on the first bad file.
pub fn validate_attachments(
    inputs: Vec<AttachmentInput>,
    policy: &AttachmentPolicy,
) -> Result<Vec<ValidatedAttachment>, BatchError> {
    if inputs.len() > policy.max_count {
        return Err(BatchError::TooMany {
            count: inputs.len(),
            max: policy.max_count,
        });
    }

    let mut validated = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        match validate_attachment(&input.bytes, &input.declared, policy) {
            Ok(format) => validated.push(ValidatedAttachment {
                file_name: input.file_name,
                format,
                bytes: input.bytes,
            }),
            Err(source) => {
                debug!(
                    index,
                    file_name = %input.file_name,
                    size = input.bytes.len(),
                    error = %source,
                    "Attachment rejected"
                );
                return Err(BatchError::Invalid {
                    index,
                    file_name: input.file_name,
                    source,
                });
            }
        }
    }

    Ok(validated)
}

/// Validate a budget PDF.
pub fn validate_document(bytes: &[u8], policy: &DocumentPolicy) -> Result<(), DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }
    let size = bytes.len() as u64;
    if size > policy.max_size_bytes {
        return Err(DocumentError::TooLarge {
            size,
            limit: policy.max_size_bytes,
        });
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(DocumentError::NotPdf);
    }
    Ok(())
}
