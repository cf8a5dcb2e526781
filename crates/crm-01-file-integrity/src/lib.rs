//! CRM-01 File Integrity - content-signature validation of uploaded files.
//!
//! Every attachment that reaches the lead store passes through this crate
//! first. The validator is a pure function of the buffer and the type the
//! client declared; it never looks at file names or extensions.
//!
//! # Pipeline Position
//!
//! ```text
//! submission ──► abuse gate ──► field validation ──► FILE INTEGRITY ──► lead store
//!                                                    (per attachment)
//! ```
//!
//! # Recognised Signatures
//!
//! | Format | Bytes                                        |
//! |--------|----------------------------------------------|
//! | JPEG   | `FF D8 FF` at 0                              |
//! | PNG    | `89 50 4E 47 0D 0A 1A 0A` at 0               |
//! | GIF    | `GIF87a` / `GIF89a` at 0                     |
//! | WEBP   | `RIFF` at 0 **and** `WEBP` at 8              |
//! | PDF    | `%PDF-` at 0 (budget documents only)         |
//!
//! A RIFF container with any other form tag (WAVE, AVI, ...) is rejected.
//!
//! # Usage
//!
//! ```ignore
//! use crm_01_file_integrity::{validate_attachment, AttachmentPolicy, DeclaredType};
//!
//! let policy = AttachmentPolicy::default();
//! let format = validate_attachment(&bytes, &DeclaredType::from_content_type(Some("image/webp")), &policy)?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod validator;

pub use domain::errors::{AttachmentError, BatchError, DocumentError};
pub use domain::policy::{AttachmentPolicy, DocumentPolicy};
pub use domain::signature::{sniff_image, DeclaredType, PDF_MAGIC};
pub use validator::{
    validate_attachment, validate_attachments, validate_document, AttachmentInput,
    ValidatedAttachment,
};
