use crate::api::error::AppError;
use std::path::Path;

/// Image formats accepted for upload, sniffed from content
pub const ALLOWED_IMAGE_MIMES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), AppError> {
    if size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
            size,
            max_size,
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Checks magic bytes against the image allowlist. The client supplied content type
/// is never trusted.
pub fn validate_image_bytes(field: &'static str, bytes: &[u8]) -> Result<&'static str, AppError> {
    if bytes.is_empty() {
        return Err(AppError::field(field, "File appears to be empty"));
    }

    let detected = infer::get(bytes).map(|kind| kind.mime_type());
    match detected.and_then(|mime| ALLOWED_IMAGE_MIMES.iter().copied().find(|m| *m == mime)) {
        Some(mime) => Ok(mime),
        None => Err(AppError::field(
            field,
            format!(
                "File type '{}' is not allowed. Only JPEG, PNG, GIF and WebP images are accepted",
                detected.unwrap_or("unknown")
            ),
        )),
    }
}

/// Strips any path component and control characters from a client file name
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if sanitized.is_empty() { None } else { Some(sanitized) }
}
