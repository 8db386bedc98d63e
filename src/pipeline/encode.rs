//! Image encoding: normalised RGB bitmap → JPEG bytes for a PDF page.
//!
//! The JPEG stream is embedded in the PDF verbatim (`/DCTDecode`), so the
//! quality chosen here is exactly the quality of the final page and the
//! encoded size is what the page costs in the output file.
//!
//! With `optimize` set the encoder builds Huffman tables from the image's
//! own symbol statistics instead of the generic tables from the JPEG
//! standard. Pixels are identical either way; only the entropy coding
//! shrinks.

use crate::error::SourceError;
use image::RgbImage;
use jpeg_encoder::{ColorType, Encoder, EncodingError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// One page ready for the assembler.
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Baseline JPEG, RGB, 8 bits per component.
    pub jpeg: Vec<u8>,
}

/// Why a bitmap could not be turned into a JPEG.
#[derive(Debug, Error)]
pub enum JpegError {
    /// JPEG frame headers store each side in 16 bits.
    #[error("{width}x{height} px exceeds the JPEG limit of 65535 px per side")]
    TooLarge { width: u32, height: u32 },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Encode `rgb` as a baseline JPEG at `quality` (1–100).
pub fn encode_jpeg(rgb: &RgbImage, quality: u8, optimize: bool) -> Result<Vec<u8>, JpegError> {
    let (width, height) = rgb.dimensions();
    let too_large = || JpegError::TooLarge { width, height };
    let w = u16::try_from(width).map_err(|_| too_large())?;
    let h = u16::try_from(height).map_err(|_| too_large())?;

    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, quality.clamp(1, 100));
    encoder.set_optimized_huffman_tables(optimize);
    encoder.encode(rgb.as_raw(), w, h, ColorType::Rgb)?;

    debug!(
        "Encoded {}x{} → {} bytes JPEG (q={}, optimized={})",
        width,
        height,
        buf.len(),
        quality,
        optimize
    );
    Ok(buf)
}

/// Encode `rgb` into a [`NormalizedPage`] for `source`.
pub fn encode_page(
    source: PathBuf,
    rgb: &RgbImage,
    quality: u8,
    optimize: bool,
) -> Result<NormalizedPage, SourceError> {
    let jpeg = encode_jpeg(rgb, quality, optimize).map_err(|e| SourceError::EncodeFailed {
        name: super::decode::file_name(&source),
        detail: e.to_string(),
    })?;
    Ok(NormalizedPage {
        width: rgb.width(),
        height: rgb.height(),
        source,
        jpeg,
    })
}
