use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::config::PreprocessConfig;

/// Decodes encoded image bytes (JPEG, PNG, ...).
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("Unreadable image data")
}

/// Converts to grayscale with the given R, G, B weights.
pub fn to_grayscale(img: &RgbaImage, weights: [f32; 3]) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let gray = pixel[0] as f32 * weights[0]
            + pixel[1] as f32 * weights[1]
            + pixel[2] as f32 * weights[2];
        output.put_pixel(x, y, Luma([gray.round().clamp(0.0, 255.0) as u8]));
    }

    output
}

/// Pushes light pixels to white and dark pixels to black.
///
/// Values above `high_threshold` become 255, values below
/// `low_threshold` become 0. Midtones are kept, or stretched linearly over
/// the full range when `stretch_midtones` is set.
///
/// Printed ticket digits are dark on light thermal paper, so this removes
/// most of the background texture without eroding the strokes.
pub fn apply_contrast(img: &mut GrayImage, config: &PreprocessConfig) {
    let low = config.low_threshold;
    let high = config.high_threshold;
    let span = high.saturating_sub(low).max(1) as f32;

    for pixel in img.pixels_mut() {
        let value = pixel[0];
        pixel[0] = if value > high {
            255
        } else if value < low {
            0
        } else if config.stretch_midtones {
            (((value - low) as f32 / span) * 255.0).round() as u8
        } else {
            value
        };
    }
}

/// Enlarges the image by an integer factor so glyphs reach a size the recognizer likes.
pub fn upscale(img: &GrayImage, factor: u32) -> GrayImage {
    let factor = factor.clamp(1, 4);
    if factor == 1 {
        return img.clone();
    }
    let (width, height) = img.dimensions();
    image::imageops::resize(img, width * factor, height * factor, FilterType::CatmullRom)
}

/// Full preprocessing: grayscale, contrast curve, upscale.
pub fn enhance(img: &DynamicImage, config: &PreprocessConfig) -> GrayImage {
    let mut gray = to_grayscale(&img.to_rgba8(), config.luma_weights);
    apply_contrast(&mut gray, config);
    upscale(&gray, config.upscale)
}
