//! Normalisation: any decoded photo → RGB8 no wider than `max_width`.
//!
//! Phone photos are 4032 px wide; a slide deck page needs a third of that.
//! Downscaling before JPEG encoding is where almost all of the size saving
//! comes from. Narrower images are never upscaled.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// Target size for an image of `width`×`height` under `max_width`.
///
/// Height is scaled by the same ratio and truncated, never below 1 px.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let new_height = (height as u64 * max_width as u64 / width as u64).max(1) as u32;
    (max_width, new_height)
}

/// Convert to RGB8 and shrink to `max_width` with Lanczos3, preserving aspect ratio.
pub fn normalize_image(image: DynamicImage, max_width: u32) -> RgbImage {
    let rgb = match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    };

    let (w, h) = rgb.dimensions();
    let (tw, th) = target_dimensions(w, h, max_width);
    if (tw, th) == (w, h) {
        return rgb;
    }

    debug!("Resizing {}x{} → {}x{}", w, h, tw, th);
    imageops::resize(&rgb, tw, th, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn narrow_images_untouched() {
        assert_eq!(target_dimensions(800, 600, 1400), (800, 600));
        assert_eq!(target_dimensions(1400, 900, 1400), (1400, 900));
    }

    #[test]
    fn phone_photo_scaled() {
        // 4032x3024 is the iPhone 12 MP landscape size.
        assert_eq!(target_dimensions(4032, 3024, 1400), (1400, 1050));
        // Portrait: 3024x4032 → 1400x1866.67, truncated.
        assert_eq!(target_dimensions(3024, 4032, 1400), (1400, 1866));
    }

    #[test]
    fn extreme_panorama_keeps_one_row() {
        assert_eq!(target_dimensions(100_000, 10, 1400), (1400, 1));
    }

    #[test]
    fn aspect_ratio_within_rounding() {
        for (w, h) in [(4032, 3024), (3000, 1999), (5000, 7), (1401, 1401)] {
            let (tw, th) = target_dimensions(w, h, 1400);
            assert!(tw <= 1400);
            let expected = h as f64 * tw as f64 / w as f64;
            assert!((th as f64 - expected).abs() < 1.0 || th == 1, "{w}x{h} → {tw}x{th}");
        }
    }

    #[test]
    fn rgba_is_flattened_and_resized() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, Rgba([255, 0, 0, 128])));
        let out = normalize_image(img, 50);
        assert_eq!(out.dimensions(), (50, 25));
    }
}
