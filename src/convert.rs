//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one folder. Files are handled
//! strictly one after another: each photo is decoded, normalised and
//! encoded on the blocking pool, appended to the PDF, and its pixels are
//! dropped before the next file is opened, so peak memory is one photo plus
//! the JPEGs gathered so far.

use crate::config::{ConversionConfig, OcrConfig};
use crate::error::{Heic2PdfError, SourceError};
use crate::output::{ConversionOutput, ConversionStats, OcrOutcome, PageResult};
use crate::pipeline::assemble::{self, PdfAssembler};
use crate::pipeline::encode::NormalizedPage;
use crate::pipeline::{decode, discover, encode, normalize, ocr};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every matching photo in `config.input_dir` into one PDF.
///
/// # Returns
/// `Ok(ConversionOutput)` once the PDF is on disk, even if some files were
/// skipped (check `output.stats.failed_files`) or a non-required OCR pass
/// failed (check `output.ocr`).
///
/// # Errors
/// Returns `Err(Heic2PdfError)` only for fatal errors:
/// - input folder missing or no matching files (no PDF is written)
/// - every file failed to convert
/// - the PDF could not be written
/// - OCR failed while `config.ocr.required` is set (the plain PDF is still kept)
pub async fn convert(config: &ConversionConfig) -> Result<ConversionOutput, Heic2PdfError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", config.input_dir.display());

    // ── Step 1: Discover sources ─────────────────────────────────────────
    let sources = discover::discover_sources(&config.input_dir, &config.extensions)?;
    let total = sources.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    // ── Step 2: Normalise and append, one file at a time ─────────────────
    let normalize_start = Instant::now();
    let mut assembler =
        PdfAssembler::new(config.resolution_dpi, config.optimize).with_title(config.title.clone());
    let mut pages = Vec::with_capacity(total);

    for (i, path) in sources.into_iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index, total, &path);
        }
        let file_start = Instant::now();

        let prepared = prepare_page(
            path.clone(),
            config.max_width,
            config.jpeg_quality,
            config.optimize,
        )
        .await?;
        match prepared {
            Ok(prepared) => {
                assembler.push_page(&prepared.page)?;
                let page = &prepared.page;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(index, total, &path, page.width, page.height, page.jpeg.len());
                }
                pages.push(PageResult {
                    source: path,
                    index,
                    page_num: Some(assembler.page_count()),
                    original_width: prepared.original_width,
                    original_height: prepared.original_height,
                    width: page.width,
                    height: page.height,
                    jpeg_bytes: page.jpeg.len(),
                    duration_ms: file_start.elapsed().as_millis() as u64,
                    error: None,
                });
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(index, total, &path, &e.to_string());
                }
                pages.push(PageResult::failed(
                    path,
                    index,
                    e,
                    file_start.elapsed().as_millis() as u64,
                ));
            }
        }
    }
    let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;

    let converted = assembler.page_count();
    if converted == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Heic2PdfError::NoPagesProduced { total, first_error });
    }

    // ── Step 3: Write the plain PDF ──────────────────────────────────────
    let output_path = config.output_path();
    let base_path = if config.ocr.enabled {
        config.intermediate_path()
    } else {
        output_path.clone()
    };
    let written = assembler.write_to(&base_path)?;
    info!("Wrote {} ({} pages, {} bytes)", base_path.display(), converted, written);
    if let Some(ref cb) = config.progress_callback {
        cb.on_pdf_written(&base_path, converted, written);
    }

    // ── Step 4: Optional OCR ─────────────────────────────────────────────
    let ocr_start = Instant::now();
    let ocr_outcome = if config.ocr.enabled {
        apply_ocr(config, &base_path, &output_path).await?
    } else {
        OcrOutcome::Skipped
    };
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let output_bytes = std::fs::metadata(&output_path)
        .map(|m| m.len())
        .map_err(|source| Heic2PdfError::OutputWriteFailed {
            path: output_path.clone(),
            source,
        })?;

    let stats = ConversionStats {
        total_files: total,
        converted_files: converted,
        failed_files: total - converted,
        output_bytes,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        normalize_duration_ms,
        ocr_duration_ms,
    };

    info!(
        "Conversion complete: {}/{} files, {} bytes, {}ms total",
        converted, total, output_bytes, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total, converted);
    }

    Ok(ConversionOutput {
        output_path,
        pages,
        ocr: ocr_outcome,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a current-thread tokio runtime internally.
pub fn convert_sync(config: &ConversionConfig) -> Result<ConversionOutput, Heic2PdfError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Heic2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(config))
}

/// Add a text layer to an existing PDF.
///
/// `output` defaults to `<stem>-ocr.pdf` next to `input`; `input` is left
/// untouched. Unlike OCR inside [`convert`], any failure here is fatal.
pub async fn ocr_existing_pdf(
    input: &Path,
    output: Option<&Path>,
    config: &OcrConfig,
) -> Result<PathBuf, Heic2PdfError> {
    config.validate()?;
    if !looks_like_pdf(input) {
        return Err(Heic2PdfError::NotAPdf {
            path: input.to_path_buf(),
        });
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| OcrConfig::default_output_for(input));
    if output == input {
        return Err(Heic2PdfError::InvalidConfig(
            "OCR output must differ from the input PDF".into(),
        ));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Heic2PdfError::OutputWriteFailed {
            path: output.clone(),
            source,
        })?;
    }

    ocr::run_ocr(input, &output, config).await?;
    Ok(output)
}

/// Number of pages in the PDF at `path`.
pub fn pdf_page_count(path: &Path) -> Result<usize, Heic2PdfError> {
    assemble::count_pages(path).map_err(|e| {
        debug!("lopdf could not load {}: {}", path.display(), e);
        Heic2PdfError::NotAPdf {
            path: path.to_path_buf(),
        }
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PreparedPage {
    page: NormalizedPage,
    original_width: u32,
    original_height: u32,
}

/// Decode, normalise and encode one file on the blocking pool.
///
/// The outer `Result` is fatal (the task itself died); the inner one is the
/// per-file outcome.
async fn prepare_page(
    path: PathBuf,
    max_width: u32,
    quality: u8,
    optimize: bool,
) -> Result<Result<PreparedPage, SourceError>, Heic2PdfError> {
    tokio::task::spawn_blocking(move || -> Result<PreparedPage, SourceError> {
        let source = decode::decode_source(&path)?;
        let (original_width, original_height) = (source.image.width(), source.image.height());
        let rgb = normalize::normalize_image(source.image, max_width);
        let page = encode::encode_page(source.path, &rgb, quality, optimize)?;
        Ok(PreparedPage {
            page,
            original_width,
            original_height,
        })
    })
    .await
    .map_err(|e| Heic2PdfError::Internal(format!("Image task panicked: {}", e)))
}

/// Run OCR from `base` into `output`, keeping the plain PDF at `output` if
/// anything goes wrong.
async fn apply_ocr(
    config: &ConversionConfig,
    base: &Path,
    output: &Path,
) -> Result<OcrOutcome, Heic2PdfError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_ocr_start(&config.ocr.language);
    }
    let start = Instant::now();

    let outcome = match ocr::run_ocr(base, output, &config.ocr).await {
        Ok(()) => {
            if !config.ocr.keep_intermediate {
                if let Err(e) = std::fs::remove_file(base) {
                    warn!("Could not remove {}: {}", base.display(), e);
                }
            }
            OcrOutcome::Applied {
                language: config.ocr.language.clone(),
                backend: config.ocr.backend,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(e) => {
            warn!("OCR failed: {}. Keeping non-OCR PDF as {}", e, output.display());
            restore_plain_pdf(base, output)?;
            let outcome = OcrOutcome::Failed {
                error: e.to_string(),
            };
            if config.ocr.required {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_ocr_complete(&outcome);
                }
                return Err(e.into());
            }
            outcome
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_ocr_complete(&outcome);
    }
    Ok(outcome)
}

/// Move the plain PDF at `base` to `output`, replacing any partial OCR output.
fn restore_plain_pdf(base: &Path, output: &Path) -> Result<(), Heic2PdfError> {
    let write_failed = |source| Heic2PdfError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };
    if output.exists() {
        std::fs::remove_file(output).map_err(write_failed)?;
    }
    std::fs::rename(base, output).map_err(write_failed)
}

/// Cheap `%PDF` magic check so a typo does not reach the OCR tool.
fn looks_like_pdf(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == b"%PDF")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pdf_magic_check() {
        let tmp = TempDir::new().unwrap();
        let pdf = tmp.path().join("a.pdf");
        let txt = tmp.path().join("a.txt");
        std::fs::write(&pdf, b"%PDF-1.7\n...").unwrap();
        std::fs::write(&txt, b"hello").unwrap();
        assert!(looks_like_pdf(&pdf));
        assert!(!looks_like_pdf(&txt));
        assert!(!looks_like_pdf(&tmp.path().join("missing.pdf")));
    }

    #[test]
    fn restore_replaces_partial_output() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("deck_temp.pdf");
        let out = tmp.path().join("deck.pdf");
        std::fs::write(&base, b"%PDF plain").unwrap();
        std::fs::write(&out, b"half-written").unwrap();

        restore_plain_pdf(&base, &out).unwrap();
        assert!(!base.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF plain");
    }

    #[tokio::test]
    async fn ocr_only_rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("notes.txt");
        std::fs::write(&input, b"just text").unwrap();
        let err = ocr_existing_pdf(&input, None, &OcrConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Heic2PdfError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn ocr_only_refuses_in_place() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("deck.pdf");
        std::fs::write(&input, b"%PDF-1.5\n").unwrap();
        let err = ocr_existing_pdf(&input, Some(&input), &OcrConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Heic2PdfError::InvalidConfig(_)));
    }
}
