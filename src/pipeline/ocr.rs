//! OCR post-processing: plain image PDF → PDF with an invisible text layer.
//!
//! OCR itself is done by external tools; this module only locates them,
//! drives them and maps their failures onto [`OcrError`]. Two tool chains
//! are supported:
//!
//! * **ocrmypdf**: one call, rewrites the whole PDF. `--skip-text` leaves
//!   pages that already carry text alone, so running it twice is harmless.
//! * **tesseract**: `pdftoppm` rasterises each page, `tesseract … pdf`
//!   turns every PNG into a one-page searchable PDF, `pdfunite` joins them.
//!   Intermediates live in a `TempDir` and disappear on every exit path.
//!
//! The input PDF is never modified.

use crate::config::{OcrBackend, OcrConfig};
use crate::error::OcrError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Last lines of a tool's stderr kept in [`OcrError::ToolFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// Resolve `tool` to an executable path: `explicit` if given, else `PATH`.
pub fn locate_tool(tool: &str, explicit: Option<&Path>) -> Result<PathBuf, OcrError> {
    let missing = || OcrError::ToolMissing {
        tool: tool.to_string(),
        hint: OcrBackend::install_hint(tool),
    };
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(_) => Err(missing()),
        None => which::which(tool).map_err(|_| missing()),
    }
}

/// Resolve every tool `config.backend` needs, main tool first.
///
/// `config.tool_path` overrides the lookup of the main tool only.
pub fn check_tools(config: &OcrConfig) -> Result<Vec<PathBuf>, OcrError> {
    config
        .backend
        .tools()
        .iter()
        .enumerate()
        .map(|(i, tool)| {
            let explicit = if i == 0 { config.tool_path.as_deref() } else { None };
            locate_tool(tool, explicit)
        })
        .collect()
}

/// OCR `input` into `output` with the configured backend.
pub async fn run_ocr(input: &Path, output: &Path, config: &OcrConfig) -> Result<(), OcrError> {
    let tools = check_tools(config)?;
    info!(
        "Running OCR ({}, language {}) on {}",
        config.backend,
        config.language,
        input.display()
    );

    match config.backend {
        OcrBackend::OcrMyPdf => run_ocrmypdf(&tools[0], input, output, config).await?,
        OcrBackend::Tesseract => {
            run_tesseract_chain(&tools[0], &tools[1], &tools[2], input, output, config).await?
        }
    }

    if !output.is_file() {
        return Err(OcrError::MissingOutput {
            tool: config.backend.to_string(),
            path: output.to_path_buf(),
        });
    }
    info!("OCR complete: {}", output.display());
    Ok(())
}

/// Arguments for one `ocrmypdf` call.
pub fn ocrmypdf_args(input: &Path, output: &Path, config: &OcrConfig) -> Vec<OsString> {
    vec![
        "-l".into(),
        config.language.clone().into(),
        "--skip-text".into(),
        "--optimize".into(),
        config.optimize_level.to_string().into(),
        "--jpeg-quality".into(),
        config.jpeg_quality.to_string().into(),
        input.as_os_str().to_os_string(),
        output.as_os_str().to_os_string(),
    ]
}

async fn run_ocrmypdf(
    ocrmypdf: &Path,
    input: &Path,
    output: &Path,
    config: &OcrConfig,
) -> Result<(), OcrError> {
    run_tool("ocrmypdf", ocrmypdf, &ocrmypdf_args(input, output, config)).await
}

async fn run_tesseract_chain(
    tesseract: &Path,
    pdftoppm: &Path,
    pdfunite: &Path,
    input: &Path,
    output: &Path,
    config: &OcrConfig,
) -> Result<(), OcrError> {
    let work = tempfile::TempDir::new()?;
    debug!("OCR working directory: {}", work.path().display());

    // 1. PDF → page-1.png, page-2.png, …
    let prefix = work.path().join("page");
    run_tool(
        "pdftoppm",
        pdftoppm,
        &[
            "-r".into(),
            config.raster_dpi.to_string().into(),
            "-png".into(),
            input.as_os_str().to_os_string(),
            prefix.into_os_string(),
        ],
    )
    .await?;

    let images = page_images(work.path())?;
    if images.is_empty() {
        return Err(OcrError::MissingOutput {
            tool: "pdftoppm".to_string(),
            path: work.path().to_path_buf(),
        });
    }

    // 2. One searchable PDF per page image.
    let mut page_pdfs = Vec::with_capacity(images.len());
    for image in &images {
        let base = image.with_extension("");
        run_tool(
            "tesseract",
            tesseract,
            &[
                image.as_os_str().to_os_string(),
                base.as_os_str().to_os_string(),
                "-l".into(),
                config.language.clone().into(),
                "pdf".into(),
            ],
        )
        .await?;
        let page_pdf = base.with_extension("pdf");
        if !page_pdf.is_file() {
            return Err(OcrError::MissingOutput {
                tool: "tesseract".to_string(),
                path: page_pdf,
            });
        }
        page_pdfs.push(page_pdf);
    }

    // 3. Join.
    if let [single] = page_pdfs.as_slice() {
        std::fs::copy(single, output)?;
        return Ok(());
    }
    let mut args: Vec<OsString> = page_pdfs.into_iter().map(PathBuf::into_os_string).collect();
    args.push(output.as_os_str().to_os_string());
    run_tool("pdfunite", pdfunite, &args).await
}

/// PNGs written by `pdftoppm` into `dir`, in page order.
///
/// `pdftoppm` pads the page number to the width of the page count, so the
/// number after the last `-` is compared numerically rather than by name.
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut images: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
        .map(|p| (page_number(&p).unwrap_or(u32::MAX), p))
        .collect();
    images.sort();
    Ok(images.into_iter().map(|(_, p)| p).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    path.file_stem()?.to_str()?.rsplit('-').next()?.parse().ok()
}

/// Run `program` to completion, mapping failure to [`OcrError`].
async fn run_tool(tool: &str, program: &Path, args: &[OsString]) -> Result<(), OcrError> {
    debug!("$ {} {:?}", program.display(), args);
    let output = Command::new(program).args(args).output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OcrError::ToolMissing {
                tool: tool.to_string(),
                hint: OcrBackend::install_hint(tool),
            }
        } else {
            OcrError::Io(e)
        }
    })?;

    if !output.status.success() {
        return Err(OcrError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocrmypdf_arguments() {
        let config = OcrConfig {
            language: "eng+deu".into(),
            optimize_level: 3,
            jpeg_quality: 75,
            ..Default::default()
        };
        let args = ocrmypdf_args(Path::new("in.pdf"), Path::new("out.pdf"), &config);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-l",
                "eng+deu",
                "--skip-text",
                "--optimize",
                "3",
                "--jpeg-quality",
                "75",
                "in.pdf",
                "out.pdf"
            ]
        );
    }

    #[test]
    fn explicit_missing_tool_path_reports_hint() {
        let err = locate_tool("ocrmypdf", Some(Path::new("/definitely/not/here/ocrmypdf")))
            .unwrap_err();
        match err {
            OcrError::ToolMissing { tool, hint } => {
                assert_eq!(tool, "ocrmypdf");
                assert!(hint.contains("install"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_tool_is_missing() {
        let err = locate_tool("heic2pdf-no-such-ocr-tool", None).unwrap_err();
        assert!(matches!(err, OcrError::ToolMissing { .. }));
    }

    #[tokio::test]
    async fn missing_backend_leaves_no_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let input = tmp.path().join("in.pdf");
        let output = tmp.path().join("out.pdf");
        std::fs::write(&input, b"%PDF-1.5\n").unwrap();
        let config = OcrConfig {
            tool_path: Some(tmp.path().join("missing-ocrmypdf")),
            ..Default::default()
        };

        let err = run_ocr(&input, &output, &config).await.unwrap_err();
        assert!(matches!(err, OcrError::ToolMissing { .. }));
        assert!(!output.exists());
        assert!(input.exists());
    }

    #[test]
    fn page_images_follow_page_numbers() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "page-9.png", "notes.txt"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = page_images(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-9.png", "page-10.png"]);
    }

    #[test]
    fn page_images_accept_zero_padding() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["page-003.png", "page-010.png", "page-001.png"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let numbers: Vec<Option<u32>> = page_images(tmp.path())
            .unwrap()
            .iter()
            .map(|p| page_number(p))
            .collect();
        assert_eq!(numbers, vec![Some(1), Some(3), Some(10)]);
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let long: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 49"));
    }
}
