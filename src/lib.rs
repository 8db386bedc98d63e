//! # heic2pdf
//!
//! Turn a folder of iPhone photos (HEIC) into one compact, searchable PDF.
//!
//! Photos of slides or whiteboards straight off a phone are 2–4 MB each and
//! 4032 px wide. This crate shrinks each one to a sensible page width,
//! re-encodes it as JPEG, stacks the results into a single PDF in file-name
//! order, and optionally hands the PDF to an OCR tool so the text can be
//! searched and copied.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Discover   *.heic / *.HEIC, sorted by name
//!  ├─ 2. Decode     libheif (orientation applied)
//!  ├─ 3. Normalise  RGB, shrink to max width (Lanczos3)
//!  ├─ 4. Encode     JPEG at the configured quality
//!  ├─ 5. Assemble   one page per image (lopdf)
//!  └─ 6. OCR        optional: ocrmypdf or tesseract adds a hidden text layer
//! ```
//!
//! A file that cannot be decoded is reported and skipped; the rest of the
//! batch still ends up in the PDF. If OCR fails the plain PDF is kept.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heic2pdf::{convert_sync, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .input_dir("/Users/me/Desktop/Input for PDF")
//!         .output("/Users/me/Desktop/PDF Output/presentation.pdf")
//!         .build()?;
//!     let output = convert_sync(&config)?;
//!     eprintln!(
//!         "{} pages, {:.2} MB",
//!         output.page_count(),
//!         output.stats.output_mb()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `heic2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `heic`  | on      | HEIC/HEIF decoding through the system libheif |
//!
//! ## OCR tools
//!
//! OCR runs out of process. Install one of:
//!
//! | Backend | Install |
//! |---------|---------|
//! | `ocrmypdf` (default) | `brew install ocrmypdf` / `apt install ocrmypdf` |
//! | `tesseract` | `brew install tesseract poppler` / `apt install tesseract-ocr poppler-utils` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, OcrBackend, OcrConfig};
pub use convert::{convert, convert_sync, ocr_existing_pdf, pdf_page_count};
pub use error::{Heic2PdfError, OcrError, SourceError};
pub use output::{ConversionOutput, ConversionStats, OcrOutcome, PageResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
