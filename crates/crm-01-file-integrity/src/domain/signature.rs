//! Magic-byte signatures and declared content types.

use crm_types::ImageFormat;

pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
pub const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const GIF87_MAGIC: &[u8] = b"GIF87a";
pub const GIF89_MAGIC: &[u8] = b"GIF89a";
pub const RIFF_MAGIC: &[u8] = b"RIFF";
pub const WEBP_FORM_TAG: &[u8] = b"WEBP";
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Offset of the form tag inside a RIFF header (after "RIFF" + u32 size).
const RIFF_FORM_OFFSET: usize = 8;

/// Identify an image by its leading bytes.
///
/// Returns `None` for anything that is not one of the known image formats,
/// including RIFF containers that do not carry the `WEBP` form tag.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(GIF87_MAGIC) || bytes.starts_with(GIF89_MAGIC) {
        Some(ImageFormat::Gif)
    } else if is_webp(bytes) {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// RIFF container carrying a non-WEBP payload.
pub fn is_foreign_riff(bytes: &[u8]) -> bool {
    bytes.starts_with(RIFF_MAGIC) && !is_webp(bytes)
}

fn is_webp(bytes: &[u8]) -> bool {
    bytes.starts_with(RIFF_MAGIC)
        && bytes
            .get(RIFF_FORM_OFFSET..RIFF_FORM_OFFSET + WEBP_FORM_TAG.len())
            .is_some_and(|tag| tag == WEBP_FORM_TAG)
}

/// Content type the client claimed for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// A concrete image MIME type. The content must match it exactly.
    Image(ImageFormat),
    /// "Some image" (no content type, `application/octet-stream`, `image/*`).
    /// Any allowed signature is accepted.
    AnyImage,
    /// A content type that can never be an accepted image.
    Other(String),
}

impl DeclaredType {
    /// Interpret a multipart `Content-Type` value.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return DeclaredType::AnyImage;
        };
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "" | "application/octet-stream" | "image/*" | "image" => DeclaredType::AnyImage,
            other => match ImageFormat::from_mime(other) {
                Some(format) => DeclaredType::Image(format),
                None => DeclaredType::Other(other.to_string()),
            },
        }
    }
}
