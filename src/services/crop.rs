//! Crop rectangle remapping from the client canvas to source pixels.
//!
//! The admin UI crops against a scaled canvas and reports the rectangle in canvas
//! coordinates together with the dimensions of the image it loaded. The rectangle is
//! only honoured when those dimensions match the uploaded bytes; otherwise the client is
//! assumed to have cropped the file itself and the source is used as-is.

use crate::api::error::AppError;
use serde::{Deserialize, Serialize};

/// Crop fields as they arrive on an upload. Any missing field disables cropping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRequest {
    pub canvas_width: Option<f64>,
    pub canvas_height: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub orig_width: Option<f64>,
    pub orig_height: Option<f64>,
}

/// A complete, validated crop request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub orig_width: f64,
    pub orig_height: f64,
}

/// Pixel rectangle inside the decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRequest {
    pub const FIELDS: [&'static str; 8] = [
        "crop_canvas_width",
        "crop_canvas_height",
        "crop_x",
        "crop_y",
        "crop_width",
        "crop_height",
        "orig_width",
        "orig_height",
    ];

    /// Records a multipart field. Returns `Ok(false)` when `name` is not a crop field.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<bool, AppError> {
        let slot = match name {
            "crop_canvas_width" => &mut self.canvas_width,
            "crop_canvas_height" => &mut self.canvas_height,
            "crop_x" => &mut self.x,
            "crop_y" => &mut self.y,
            "crop_width" => &mut self.width,
            "crop_height" => &mut self.height,
            "orig_width" => &mut self.orig_width,
            "orig_height" => &mut self.orig_height,
            _ => return Ok(false),
        };

        let value = value.trim();
        if value.is_empty() || value == "null" {
            *slot = None;
            return Ok(true);
        }

        let field = Self::FIELDS
            .iter()
            .copied()
            .find(|f| *f == name)
            .unwrap_or("crop");
        let parsed: f64 = value
            .parse()
            .map_err(|_| AppError::field(field, format!("{} must be a number", name)))?;
        *slot = Some(parsed);
        Ok(true)
    }

    /// Returns the complete crop, or `None` when any field is absent.
    /// Negative or non-finite values are rejected.
    pub fn validate(&self) -> Result<Option<CropBox>, AppError> {
        let values = [
            self.canvas_width,
            self.canvas_height,
            self.x,
            self.y,
            self.width,
            self.height,
            self.orig_width,
            self.orig_height,
        ];

        for (&field, value) in Self::FIELDS.iter().zip(values.iter()) {
            if let Some(v) = value
                && (!v.is_finite() || *v < 0.0)
            {
                return Err(AppError::field(
                    field,
                    format!("{} must be a non-negative number", field),
                ));
            }
        }

        match values {
            [
                Some(canvas_width),
                Some(canvas_height),
                Some(x),
                Some(y),
                Some(width),
                Some(height),
                Some(orig_width),
                Some(orig_height),
            ] => Ok(Some(CropBox {
                canvas_width,
                canvas_height,
                x,
                y,
                width,
                height,
                orig_width,
                orig_height,
            })),
            _ => Ok(None),
        }
    }
}

fn scale(orig: f64, canvas: f64) -> f64 {
    if canvas > 0.0 { orig / canvas } else { 1.0 }
}

/// Maps a client crop into source pixel coordinates.
///
/// Returns `None` when no crop was requested (zero width or height) or when the
/// source dimensions differ from the dimensions the client cropped against.
pub fn compute_source_rect(crop: &CropBox, source_width: u32, source_height: u32) -> Option<Rect> {
    if crop.width <= 0.0 || crop.height <= 0.0 || source_width == 0 || source_height == 0 {
        return None;
    }

    if crop.orig_width.round() as u64 != source_width as u64
        || crop.orig_height.round() as u64 != source_height as u64
    {
        tracing::info!(
            event = "CropSkipped",
            source_width,
            source_height,
            orig_width = crop.orig_width,
            orig_height = crop.orig_height,
            "Upload dimensions differ from crop reference, skipping crop"
        );
        return None;
    }

    let scale_x = scale(crop.orig_width, crop.canvas_width);
    let scale_y = scale(crop.orig_height, crop.canvas_height);

    let sw = source_width as i64;
    let sh = source_height as i64;

    let x = ((crop.x * scale_x).round() as i64).clamp(0, sw - 1);
    let y = ((crop.y * scale_y).round() as i64).clamp(0, sh - 1);
    let width = ((crop.width * scale_x).round() as i64).clamp(1, sw - x);
    let height = ((crop.height * scale_y).round() as i64).clamp(1, sh - y);

    Some(Rect {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}
