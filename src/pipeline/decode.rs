//! Source decoding: photo file → upright `DynamicImage`.
//!
//! HEIC/HEIF goes through libheif (feature `heic`), which applies the
//! container's rotation and mirror transforms while decoding, so the bitmap
//! comes out the way the phone displayed it. Everything else goes through
//! the `image` crate and the EXIF orientation tag is applied by hand.
//!
//! Decoding is CPU-bound; callers run it inside `spawn_blocking`.

use crate::error::SourceError;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions routed to libheif.
const HEIF_EXTENSIONS: &[&str] = &["heic", "heif", "hif"];

/// A decoded photo, already rotated upright.
pub struct SourceImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// Display name used in error messages.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_heif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| HEIF_EXTENSIONS.iter().any(|h| h.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Read and decode one source file.
pub fn decode_source(path: &Path) -> Result<SourceImage, SourceError> {
    let name = file_name(path);
    let data = std::fs::read(path).map_err(|e| SourceError::Unreadable {
        name: name.clone(),
        detail: e.to_string(),
    })?;

    let image = if is_heif(path) {
        decode_heif(&data, &name)?
    } else {
        decode_with_image(data, &name)?
    };

    debug!("Decoded {} → {}x{} px", name, image.width(), image.height());
    Ok(SourceImage {
        path: path.to_path_buf(),
        image,
    })
}

#[cfg(feature = "heic")]
fn decode_heif(data: &[u8], name: &str) -> Result<DynamicImage, SourceError> {
    use image::RgbImage;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let failed = |detail: String| SourceError::DecodeFailed {
        name: name.to_string(),
        detail,
    };

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data).map_err(|e| failed(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| failed(e.to_string()))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| failed(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| failed("no interleaved RGB plane".to_string()))?;

    // Rows are padded to `stride`; copy only the visible pixels.
    let (width, height) = (plane.width, plane.height);
    let row_bytes = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    RgbImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| failed(format!("short pixel buffer for {width}x{height}")))
}

#[cfg(not(feature = "heic"))]
fn decode_heif(_data: &[u8], name: &str) -> Result<DynamicImage, SourceError> {
    Err(SourceError::UnsupportedFormat {
        name: name.to_string(),
        format: "HEIC/HEIF".to_string(),
        hint: "Rebuild with `--features heic` (needs libheif installed).".to_string(),
    })
}

fn decode_with_image(data: Vec<u8>, name: &str) -> Result<DynamicImage, SourceError> {
    let failed = |e: image::ImageError| SourceError::DecodeFailed {
        name: name.to_string(),
        detail: e.to_string(),
    };

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SourceError::Unreadable {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
    let mut decoder = reader.into_decoder().map_err(failed)?;
    let orientation = decoder
        .orientation()
        .unwrap_or(image::metadata::Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(failed)?;
    image.apply_orientation(orientation);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn decodes_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.png");
        RgbImage::from_pixel(30, 20, Rgb([10, 20, 30]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let src = decode_source(&path).unwrap();
        assert_eq!((src.image.width(), src.image.height()), (30, 20));
        assert_eq!(src.path, path);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

        match decode_source(&path) {
            Err(SourceError::DecodeFailed { name, .. }) => assert_eq!(name, "broken.png"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("garbage decoded"),
        }
    }

    #[test]
    fn garbage_heic_is_reported_per_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.HEIC");
        std::fs::write(&path, b"definitely not an ISOBMFF container").unwrap();

        let err = decode_source(&path).err().expect("garbage must not decode");
        assert!(err.to_string().contains("IMG_0001.HEIC"), "got: {err}");
    }

    #[test]
    fn missing_file_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let err = decode_source(&tmp.path().join("gone.heic")).err().unwrap();
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }

    /// Write a HEIC whose left half is red and right half blue.
    /// Returns `false` when libheif was built without an HEVC encoder.
    #[cfg(feature = "heic")]
    fn write_split_heic(
        path: &Path,
        width: u32,
        height: u32,
        orientation: Option<libheif_rs::ImageOrientation>,
    ) -> bool {
        use libheif_rs::{
            Channel, ColorSpace, CompressionFormat, EncoderQuality, EncodingOptions, HeifContext,
            Image, LibHeif, RgbChroma,
        };

        let lib_heif = LibHeif::new();
        let Ok(mut encoder) = lib_heif.encoder_for_format(CompressionFormat::Hevc) else {
            return false;
        };
        encoder.set_quality(EncoderQuality::Lossy(90)).unwrap();

        let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::C444)).unwrap();
        for channel in [Channel::R, Channel::G, Channel::B] {
            image.create_plane(channel, width, height, 8).unwrap();
        }
        let planes = image.planes_mut();
        let (mut r, mut g, mut b) = (planes.r.unwrap(), planes.g.unwrap(), planes.b.unwrap());
        let half = width as usize / 2;
        for y in 0..height as usize {
            for x in 0..width as usize {
                let left = x < half;
                r.data[y * r.stride + x] = if left { 220 } else { 20 };
                g.data[y * g.stride + x] = 20;
                b.data[y * b.stride + x] = if left { 20 } else { 220 };
            }
        }

        let mut options = EncodingOptions::new().unwrap();
        if let Some(o) = orientation {
            options.set_image_orientation(o);
        }
        let mut ctx = HeifContext::new().unwrap();
        ctx.encode_image(&image, &mut encoder, Some(options)).unwrap();
        ctx.write_to_file(path.to_str().unwrap()).unwrap();
        true
    }

    #[cfg(feature = "heic")]
    fn is_red(p: &Rgb<u8>) -> bool {
        p[0] > 150 && p[2] < 100
    }

    #[cfg(feature = "heic")]
    fn is_blue(p: &Rgb<u8>) -> bool {
        p[2] > 150 && p[0] < 100
    }

    #[cfg(feature = "heic")]
    #[test]
    fn heic_with_odd_width_keeps_every_row_aligned() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.HEIC");
        if !write_split_heic(&path, 61, 37, None) {
            println!("SKIP: libheif has no HEVC encoder");
            return;
        }

        let rgb = decode_source(&path).unwrap().image.to_rgb8();
        assert_eq!(rgb.dimensions(), (61, 37));
        // A wrong row stride shears the image, so the split would drift
        // sideways from row to row.
        for y in 0..37 {
            assert!(is_red(rgb.get_pixel(4, y)), "row {y}: {:?}", rgb.get_pixel(4, y));
            assert!(is_blue(rgb.get_pixel(60, y)), "row {y}: {:?}", rgb.get_pixel(60, y));
        }
    }

    #[cfg(feature = "heic")]
    #[test]
    fn rotated_heic_comes_out_upright() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0002.heic");
        if !write_split_heic(&path, 64, 32, Some(libheif_rs::ImageOrientation::Rotate90Cw)) {
            println!("SKIP: libheif has no HEVC encoder");
            return;
        }

        let rgb = decode_source(&path).unwrap().image.to_rgb8();
        assert_eq!(rgb.dimensions(), (32, 64), "portrait after rotation");
        // Turning clockwise brings the stored left (red) half to the top.
        assert!(is_red(rgb.get_pixel(16, 8)), "{:?}", rgb.get_pixel(16, 8));
        assert!(is_blue(rgb.get_pixel(16, 56)), "{:?}", rgb.get_pixel(16, 56));
    }

    #[test]
    fn heif_routing_ignores_case() {
        assert!(is_heif(Path::new("a.HEIC")));
        assert!(is_heif(Path::new("a.heif")));
        assert!(!is_heif(Path::new("a.png")));
    }
}
