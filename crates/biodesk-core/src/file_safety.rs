//! Attachment safety checks: filename sanitization and image sniffing.

use crate::error::{Error, Result};

/// Replace path components and characters unsafe in object names.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '#' | '%' | '\0' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Detect content type by magic bytes, falling back to the claimed type.
pub fn detect_content_type(data: &[u8], claimed: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    if claimed.is_empty() {
        "application/octet-stream".to_string()
    } else {
        claimed.to_string()
    }
}

/// Require a non-empty file whose bytes sniff as an image.
///
/// Returns the detected MIME type.
pub fn validate_image(filename: &str, data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(Error::Validation(format!("{} is empty", filename)));
    }
    match infer::get(data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        _ => Err(Error::Validation(format!("{} is not an image", filename))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_sanitize_strips_paths_and_specials() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.jpg"), "pic.jpg");
        assert_eq!(sanitize_filename("my photo?.png"), "my_photo_.png");
        assert_eq!(sanitize_filename("100%#1.jpg"), "100__1.jpg");
    }

    #[test]
    fn test_sanitize_empty_name() {
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn test_detect_content_type() {
        assert_eq!(detect_content_type(PNG_HEADER, "text/plain"), "image/png");
        assert_eq!(detect_content_type(b"hello", "text/plain"), "text/plain");
        assert_eq!(detect_content_type(b"hello", ""), "application/octet-stream");
    }

    #[test]
    fn test_validate_image() {
        assert_eq!(validate_image("a.png", PNG_HEADER).unwrap(), "image/png");
        assert_eq!(validate_image("a.jpg", JPEG_HEADER).unwrap(), "image/jpeg");
        assert!(matches!(
            validate_image("a.png", b""),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_image("a.txt", b"just some text"),
            Err(Error::Validation(_))
        ));
    }
}
