//! Error types for the heic2pdf library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`Heic2PdfError`] is **fatal**: the run cannot produce a PDF at all
//!   (input folder missing, no matching photos, output not writable).
//!   Returned as `Err(Heic2PdfError)` from the top-level `convert*` functions.
//!
//! * [`SourceError`] is **non-fatal**: a single photo could not be decoded or
//!   re-encoded, but every other photo is fine. Stored inside
//!   [`crate::output::PageResult`] so one bad file never costs the whole
//!   batch.
//!
//! * [`OcrError`] means the external OCR step failed. The base PDF is kept, so
//!   this is only fatal when OCR was explicitly required.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the heic2pdf library.
///
/// Per-file failures use [`SourceError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Heic2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input folder does not exist.
    #[error("Input folder not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// Input folder exists but could not be listed.
    #[error("Cannot read input folder '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Discovery found nothing to convert.
    #[error("No {extensions} files found in '{path}'")]
    NoSourceFiles { path: PathBuf, extensions: String },

    /// Input for `--ocr-only` is missing or not a PDF.
    #[error("File is not a readable PDF: '{path}'")]
    NotAPdf { path: PathBuf },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Every discovered file failed; there is nothing to put in a PDF.
    #[error("All {total} files failed to convert.\nFirst error: {first_error}")]
    NoPagesProduced { total: usize, first_error: String },

    /// Some files succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any per-file failure as an error.
    #[error("{failed}/{total} files failed during conversion")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    /// lopdf refused to serialise the document.
    #[error("PDF assembly failed: {0}")]
    PdfAssembly(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// OCR was required (or was the only requested step) and failed.
    #[error(transparent)]
    Ocr(#[from] OcrError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source photo.
///
/// The conversion continues with the next file; the failure is reported
/// through the progress callback and kept on the file's `PageResult`.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// The file could not be opened or read.
    #[error("{name}: cannot read file: {detail}")]
    Unreadable { name: String, detail: String },

    /// The bytes are not a decodable image.
    #[error("{name}: decode failed: {detail}")]
    DecodeFailed { name: String, detail: String },

    /// The format is known but support was not compiled in.
    #[error("{name}: {format} support is not compiled in.\n{hint}")]
    UnsupportedFormat {
        name: String,
        format: String,
        hint: String,
    },

    /// The normalised bitmap could not be JPEG-encoded.
    #[error("{name}: JPEG encoding failed: {detail}")]
    EncodeFailed { name: String, detail: String },
}

/// Failure of the external OCR post-processor.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The OCR tool is not installed or not on `PATH`.
    #[error("OCR tool '{tool}' not found.\n{hint}")]
    ToolMissing { tool: String, hint: String },

    /// The tool ran but exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The tool succeeded but left no output where it was told to.
    #[error("{tool} produced no output at '{path}'")]
    MissingOutput { tool: String, path: PathBuf },

    /// Spawning the tool or shuffling its files failed.
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}
