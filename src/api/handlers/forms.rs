use crate::api::error::AppError;
use crate::services::crop::{CropBox, CropRequest};
use crate::utils::validation::{sanitize_filename, validate_file_size, validate_image_bytes};
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use std::collections::HashMap;

/// Image part of a multipart upload, already sniffed and size checked
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub mime_type: &'static str,
}

/// Parsed multipart body: text fields, tags, crop coordinates and image parts
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub text: HashMap<String, String>,
    /// `None` when no `tags` / `tags[]` field was sent
    pub tags: Option<Vec<String>>,
    pub crop: CropRequest,
    pub images: HashMap<&'static str, UploadedImage>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Reads the whole form. `image_fields` names the parts that carry image files.
pub async fn read_multipart(
    multipart: &mut Multipart,
    image_fields: &[&'static str],
    max_size: usize,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(image_field) = image_fields.iter().copied().find(|f| *f == name) {
            let file_name = field.file_name().and_then(sanitize_filename);
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty part for an untouched file input
            if bytes.is_empty() && file_name.is_none() {
                continue;
            }
            validate_file_size(bytes.len(), max_size)?;
            let mime_type = validate_image_bytes(image_field, &bytes)?;
            form.images.insert(
                image_field,
                UploadedImage {
                    bytes: bytes.to_vec(),
                    file_name,
                    mime_type,
                },
            );
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;

        if form.crop.set_field(&name, &value)? {
            continue;
        }

        if name == "tags" || name == "tags[]" {
            let tags = form.tags.get_or_insert_with(Vec::new);
            tags.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        form.text.insert(name, value);
    }

    Ok(form)
}

impl MultipartForm {
    pub fn has(&self, name: &str) -> bool {
        self.text.contains_key(name)
    }

    /// Trimmed value; blank and `null` count as absent
    pub fn value(&self, name: &str) -> Option<String> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != "null")
            .map(str::to_string)
    }

    /// Raw value as sent, so that an empty string can clear a field
    pub fn raw(&self, name: &str) -> Option<String> {
        self.text.get(name).cloned()
    }

    pub fn take_image(&mut self, name: &str) -> Option<UploadedImage> {
        self.images.remove(name)
    }

    pub fn crop_box(&self) -> Result<Option<CropBox>, AppError> {
        self.crop.validate()
    }

    pub fn int(&self, field: &'static str) -> Result<Option<i32>, AppError> {
        self.value(field)
            .map(|v| {
                v.parse::<i32>()
                    .map_err(|_| AppError::field(field, format!("{} must be an integer", field)))
            })
            .transpose()
    }

    /// Maps a two-valued enum field onto a bool
    pub fn choice(
        &self,
        field: &'static str,
        truthy: &str,
        falsy: &str,
    ) -> Result<Option<bool>, AppError> {
        match self.value(field) {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case(truthy) => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case(falsy) => Ok(Some(false)),
            Some(_) => Err(AppError::field(
                field,
                format!("{} must be one of {}, {}", field, truthy, falsy),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            text: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_value_treats_blank_and_null_as_absent() {
        let f = form(&[("a", "  x "), ("b", ""), ("c", "null")]);
        assert_eq!(f.value("a").as_deref(), Some("x"));
        assert_eq!(f.value("b"), None);
        assert_eq!(f.value("c"), None);
        assert!(f.has("b"));
        assert_eq!(f.raw("b").as_deref(), Some(""));
    }

    #[test]
    fn test_choice_fields() {
        let f = form(&[("status", "Inactive"), ("visibility", "secret")]);
        assert_eq!(f.choice("status", "active", "inactive").unwrap(), Some(false));
        assert!(f.choice("visibility", "public", "private").is_err());
        assert_eq!(f.choice("missing", "public", "private").unwrap(), None);
    }

    #[test]
    fn test_int_field() {
        let f = form(&[("sort_order", "3"), ("bad", "three")]);
        assert_eq!(f.int("sort_order").unwrap(), Some(3));
        assert!(matches!(f.int("bad"), Err(AppError::Validation(_))));
    }
}
