//! Chroma-key transparency for signature images.
//!
//! Pixels whose luminance (mean of R, G and B) is above the upper threshold or
//! below the lower threshold lose their alpha; every other pixel is copied as is.
//! Decoding failures fall back to the original bytes: a signature without the
//! transparency effect is still a usable signature.

use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

pub const DEFAULT_UPPER_THRESHOLD: u8 = 235;
pub const DEFAULT_LOWER_THRESHOLD: u8 = 35;

/// Luminance bounds. Pixels outside `[lower, upper]` become fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparencyThresholds {
    pub upper: u8,
    pub lower: u8,
}

impl Default for TransparencyThresholds {
    fn default() -> Self {
        Self {
            upper: DEFAULT_UPPER_THRESHOLD,
            lower: DEFAULT_LOWER_THRESHOLD,
        }
    }
}

impl TransparencyThresholds {
    pub fn new(upper: u8, lower: u8) -> Self {
        Self { upper, lower }
    }

    /// Compares the channel sum against 3x the thresholds, which is exact for
    /// the mean without going through floats.
    fn is_keyed(&self, pixel: &Rgba<u8>) -> bool {
        let sum = pixel[0] as u16 + pixel[1] as u16 + pixel[2] as u16;
        sum > 3 * self.upper as u16 || sum < 3 * self.lower as u16
    }
}

/// Result of `make_transparent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    /// False when the input could not be decoded and was passed through
    pub transparent: bool,
}

/// Applies the chroma key to an already decoded image.
pub fn apply_transparency(img: &RgbaImage, thresholds: TransparencyThresholds) -> RgbaImage {
    let mut keyed = img.clone();
    for pixel in keyed.pixels_mut() {
        if thresholds.is_keyed(pixel) {
            pixel[3] = 0;
        }
    }
    keyed
}

/// Decodes `data`, applies the chroma key and re-encodes as PNG.
///
/// Never fails: undecodable input comes back unchanged with
/// `transparent == false`.
pub fn make_transparent(data: &[u8], thresholds: TransparencyThresholds) -> ProcessedImage {
    match encode_transparent(data, thresholds) {
        Ok(png) => ProcessedImage {
            data: png,
            content_type: "image/png",
            transparent: true,
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                bytes = data.len(),
                "Signature transparency skipped, uploading original image"
            );
            ProcessedImage {
                data: data.to_vec(),
                content_type: guess_content_type(data),
                transparent: false,
            }
        }
    }
}

fn encode_transparent(
    data: &[u8],
    thresholds: TransparencyThresholds,
) -> Result<Vec<u8>, image::ImageError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let img = reader.decode()?.to_rgba8();
    let keyed = apply_transparency(&img, thresholds);

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(keyed).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn guess_content_type(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}
