use crate::entities::media_variants::VariantKind;
use crate::services::crop::{CropBox, Rect, compute_source_rect};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum MediaProcessingError {
    #[error("source image could not be decoded: {0}")]
    Decode(String),

    #[error("variant encoding failed: {0}")]
    Encode(String),

    #[error("image worker failed: {0}")]
    Worker(String),

    #[error("storage write failed: {0}")]
    Storage(String),
}

/// Target boxes and encoding quality for the resized variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPolicy {
    pub large: (u32, u32),
    pub thumbnail: (u32, u32),
    pub quality: u8,
}

impl Default for VariantPolicy {
    fn default() -> Self {
        Self {
            large: (1200, 900),
            thumbnail: (400, 300),
            quality: 90,
        }
    }
}

/// One encoded rendition ready to be stored
#[derive(Debug, Clone)]
pub struct DerivedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct DerivedVariants {
    pub original: DerivedImage,
    pub large: DerivedImage,
    pub thumbnail: DerivedImage,
    /// Crop that was actually applied to the resized variants
    pub applied_crop: Option<Rect>,
}

impl DerivedVariants {
    pub fn into_kinds(self) -> [(VariantKind, DerivedImage); 3] {
        [
            (VariantKind::Original, self.original),
            (VariantKind::Large, self.large),
            (VariantKind::Thumbnail, self.thumbnail),
        ]
    }
}

/// Derives the canonical variant set from an upload.
///
/// `original` keeps the uploaded bytes untouched. The crop (if it maps onto the
/// decoded source) is applied once to a working image and both resized variants are
/// fill-resized from it, so they always show the same region.
pub fn derive_variants(
    source: Vec<u8>,
    crop: Option<&CropBox>,
    policy: &VariantPolicy,
) -> Result<DerivedVariants, MediaProcessingError> {
    let img = image::load_from_memory(&source)
        .map_err(|e| MediaProcessingError::Decode(e.to_string()))?;
    let (source_width, source_height) = img.dimensions();

    let rect = crop.and_then(|c| compute_source_rect(c, source_width, source_height));
    let (working, applied_crop) = apply_crop(img, rect);

    let large = fill_variant(&working, policy.large, policy.quality)?;
    let thumbnail = fill_variant(&working, policy.thumbnail, policy.quality)?;

    let (mime_type, extension) = sniff_type(&source);
    debug!(
        "Derived variants from {}x{} {} (crop: {:?})",
        source_width, source_height, mime_type, applied_crop
    );

    Ok(DerivedVariants {
        original: DerivedImage {
            bytes: source,
            width: source_width,
            height: source_height,
            mime_type,
            extension,
        },
        large,
        thumbnail,
        applied_crop,
    })
}

/// Runs `derive_variants` on the blocking pool
pub async fn derive_variants_blocking(
    source: Vec<u8>,
    crop: Option<CropBox>,
    policy: VariantPolicy,
) -> Result<DerivedVariants, MediaProcessingError> {
    tokio::task::spawn_blocking(move || derive_variants(source, crop.as_ref(), &policy))
        .await
        .map_err(|e| MediaProcessingError::Worker(e.to_string()))?
}

fn apply_crop(img: DynamicImage, rect: Option<Rect>) -> (DynamicImage, Option<Rect>) {
    let Some(r) = rect else {
        return (img, None);
    };

    let (w, h) = img.dimensions();
    if r.width == 0 || r.height == 0 || r.x + r.width > w || r.y + r.height > h {
        warn!(
            "Crop {:?} does not fit {}x{} source, continuing uncropped",
            r, w, h
        );
        return (img, None);
    }

    (img.crop_imm(r.x, r.y, r.width, r.height), Some(r))
}

fn fill_variant(
    working: &DynamicImage,
    (width, height): (u32, u32),
    quality: u8,
) -> Result<DerivedImage, MediaProcessingError> {
    let resized = working.resize_to_fill(width, height, FilterType::Lanczos3);
    let bytes = encode_jpeg(&resized, quality)?;
    let (width, height) = resized.dimensions();
    Ok(DerivedImage {
        bytes,
        width,
        height,
        mime_type: "image/jpeg".to_string(),
        extension: "jpg".to_string(),
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaProcessingError> {
    // JPEG has no alpha channel and no 16-bit support
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out_data = Vec::new();
    let mut cursor = Cursor::new(&mut out_data);
    rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| MediaProcessingError::Encode(e.to_string()))?;
    Ok(out_data)
}

fn sniff_type(bytes: &[u8]) -> (String, String) {
    match infer::get(bytes) {
        Some(kind) => {
            let ext = match kind.extension() {
                "jpeg" => "jpg",
                other => other,
            };
            (kind.mime_type().to_string(), ext.to_string())
        }
        None => ("application/octet-stream".to_string(), "bin".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Left half red, right half blue
    fn split_image(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    fn is_red(px: Rgb<u8>) -> bool {
        px[0] > 200 && px[2] < 60
    }

    fn is_blue(px: Rgb<u8>) -> bool {
        px[2] > 200 && px[0] < 60
    }

    fn full_crop(x: f64, width: f64, orig: (f64, f64)) -> CropBox {
        CropBox {
            canvas_width: orig.0,
            canvas_height: orig.1,
            x,
            y: 0.0,
            width,
            height: orig.1,
            orig_width: orig.0,
            orig_height: orig.1,
        }
    }

    #[test]
    fn test_variants_have_policy_dimensions() {
        let source = split_image(1600, 1200, ImageOutputFormat::Jpeg(90));
        let variants = derive_variants(source.clone(), None, &VariantPolicy::default()).unwrap();

        assert_eq!((variants.large.width, variants.large.height), (1200, 900));
        assert_eq!((variants.thumbnail.width, variants.thumbnail.height), (400, 300));
        assert_eq!(variants.original.bytes, source);
        assert_eq!(variants.original.mime_type, "image/jpeg");
        assert_eq!(variants.original.extension, "jpg");
        assert_eq!((variants.original.width, variants.original.height), (1600, 1200));

        let decoded = image::load_from_memory(&variants.large.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1200, 900));
    }

    #[test]
    fn test_crop_applies_to_resized_variants_only() {
        let source = split_image(1600, 1200, ImageOutputFormat::Jpeg(90));
        let crop = full_crop(0.0, 800.0, (1600.0, 1200.0));
        let variants =
            derive_variants(source.clone(), Some(&crop), &VariantPolicy::default()).unwrap();

        assert_eq!(
            variants.applied_crop,
            Some(Rect { x: 0, y: 0, width: 800, height: 1200 })
        );
        assert_eq!(variants.original.bytes, source);

        let large = image::load_from_memory(&variants.large.bytes).unwrap().to_rgb8();
        assert_eq!(large.dimensions(), (1200, 900));
        assert!(is_red(*large.get_pixel(600, 450)));
        assert!(is_red(*large.get_pixel(1100, 450)));

        let thumb = image::load_from_memory(&variants.thumbnail.bytes).unwrap().to_rgb8();
        assert!(is_red(*thumb.get_pixel(200, 150)));
    }

    #[test]
    fn test_mismatched_crop_uses_full_source() {
        let source = split_image(1600, 1200, ImageOutputFormat::Png);
        let crop = full_crop(0.0, 800.0, (2000.0, 1500.0));
        let variants = derive_variants(source, Some(&crop), &VariantPolicy::default()).unwrap();

        assert_eq!(variants.applied_crop, None);
        assert_eq!(variants.original.mime_type, "image/png");
        assert_eq!(variants.original.extension, "png");

        let large = image::load_from_memory(&variants.large.bytes).unwrap().to_rgb8();
        assert!(is_red(*large.get_pixel(300, 450)));
        assert!(is_blue(*large.get_pixel(900, 450)));
    }

    #[test]
    fn test_fill_resize_crops_to_exact_box() {
        // Portrait source into a landscape box: no letterboxing
        let source = split_image(300, 900, ImageOutputFormat::Png);
        let policy = VariantPolicy {
            large: (400, 400),
            thumbnail: (100, 50),
            quality: 80,
        };
        let variants = derive_variants(source, None, &policy).unwrap();
        assert_eq!((variants.large.width, variants.large.height), (400, 400));
        assert_eq!((variants.thumbnail.width, variants.thumbnail.height), (100, 50));
    }

    #[test]
    fn test_undecodable_source_is_processing_error() {
        let err = derive_variants(b"not an image".to_vec(), None, &VariantPolicy::default())
            .unwrap_err();
        assert!(matches!(err, MediaProcessingError::Decode(_)));
    }

    #[test]
    fn test_alpha_source_encodes_as_jpeg() {
        let img = image::RgbaImage::from_pixel(64, 48, image::Rgba([10, 200, 10, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        let variants = derive_variants(buf, None, &VariantPolicy::default()).unwrap();
        assert_eq!(variants.large.mime_type, "image/jpeg");
        assert!(image::load_from_memory(&variants.large.bytes).is_ok());
    }

    #[tokio::test]
    async fn test_blocking_wrapper_matches_sync_result() {
        let source = split_image(160, 120, ImageOutputFormat::Png);
        let variants = derive_variants_blocking(source, None, VariantPolicy::default())
            .await
            .unwrap();
        assert_eq!((variants.large.width, variants.large.height), (1200, 900));
    }
}
