//! Result types returned by a conversion run.

use crate::config::OcrBackend;
use crate::error::{Heic2PdfError, SourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome for one discovered source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Source photo.
    pub source: PathBuf,
    /// 1-based position in discovery order.
    pub index: usize,
    /// 1-based page number in the PDF; `None` when the file was skipped.
    pub page_num: Option<usize>,
    /// Decoded size before resizing (0 when decoding failed).
    pub original_width: u32,
    pub original_height: u32,
    /// Final page image size.
    pub width: u32,
    pub height: u32,
    /// Size of the embedded JPEG stream.
    pub jpeg_bytes: usize,
    pub duration_ms: u64,
    /// Set when the file was skipped.
    pub error: Option<SourceError>,
}

impl PageResult {
    pub(crate) fn failed(source: PathBuf, index: usize, error: SourceError, duration_ms: u64) -> Self {
        Self {
            source,
            index,
            page_num: None,
            original_width: 0,
            original_height: 0,
            width: 0,
            height: 0,
            jpeg_bytes: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// What happened in the OCR step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OcrOutcome {
    /// OCR was disabled.
    Skipped,
    /// The output PDF carries a text layer.
    Applied {
        language: String,
        backend: OcrBackend,
        duration_ms: u64,
    },
    /// OCR failed; the plain PDF was kept at the output path.
    Failed { error: String },
}

impl OcrOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, OcrOutcome::Applied { .. })
    }
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_files: usize,
    pub converted_files: usize,
    pub failed_files: usize,
    /// Size of the final PDF on disk.
    pub output_bytes: u64,
    pub total_duration_ms: u64,
    pub normalize_duration_ms: u64,
    pub ocr_duration_ms: u64,
}

impl ConversionStats {
    pub fn output_mb(&self) -> f64 {
        self.output_bytes as f64 / BYTES_PER_MB
    }

    /// Average PDF megabytes per page; 0 when nothing was converted.
    pub fn average_mb_per_page(&self) -> f64 {
        if self.converted_files == 0 {
            0.0
        } else {
            self.output_mb() / self.converted_files as f64
        }
    }
}

/// Everything a caller needs to report on a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Path of the final PDF.
    pub output_path: PathBuf,
    /// One entry per discovered file, in discovery order.
    pub pages: Vec<PageResult>,
    pub ocr: OcrOutcome,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Number of pages in the produced PDF.
    pub fn page_count(&self) -> usize {
        self.stats.converted_files
    }

    /// Files that were skipped, in discovery order.
    pub fn failures(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| !p.is_ok())
    }

    /// Treat any skipped file as an error.
    pub fn into_result(self) -> Result<Self, Heic2PdfError> {
        if self.stats.failed_files > 0 {
            return Err(Heic2PdfError::PartialFailure {
                success: self.stats.converted_files,
                failed: self.stats.failed_files,
                total: self.stats.total_files,
            });
        }
        Ok(self)
    }
}
