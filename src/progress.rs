//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the folder. The CLI uses this to
//! print one line per photo; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use heic2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, path: &Path,
//!                         _w: u32, _h: u32, jpeg_bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {} ({jpeg_bytes} bytes)", path.display());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::OcrOutcome;
use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each file.
///
/// Files are processed one at a time, so events arrive strictly in order,
/// but the trait is `Send + Sync` so a callback can be shared with other
/// threads. All methods have default no-op implementations so callers only
/// override what they care about. Indices are 1-based.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after discovery, before any file is decoded.
    fn on_conversion_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is decoded.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when a file has been normalised and appended as a page.
    ///
    /// `width`/`height` are the final page pixel dimensions and
    /// `jpeg_bytes` the size of the embedded JPEG.
    fn on_file_complete(
        &self,
        index: usize,
        total: usize,
        path: &Path,
        width: u32,
        height: u32,
        jpeg_bytes: usize,
    ) {
        let _ = (index, total, path, width, height, jpeg_bytes);
    }

    /// Called when a file is skipped because it could not be converted.
    fn on_file_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once the assembled (pre-OCR) PDF is on disk.
    fn on_pdf_written(&self, path: &Path, pages: usize, bytes: u64) {
        let _ = (path, pages, bytes);
    }

    /// Called just before the external OCR tool is started.
    fn on_ocr_start(&self, language: &str) {
        let _ = language;
    }

    /// Called when the OCR step finishes, successfully or not.
    fn on_ocr_complete(&self, outcome: &OcrOutcome) {
        let _ = outcome;
    }

    /// Called once at the very end of a successful run.
    fn on_conversion_complete(&self, total_files: usize, pages: usize) {
        let _ = (total_files, pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
