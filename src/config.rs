//! Configuration types for HEIC-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the settings
//! the tool ships with: current folder in, `presentation.pdf` out, 1400 px
//! wide pages at JPEG quality 80, OCR in English.

use crate::error::Heic2PdfError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One Tesseract language code, or several joined with `+` (`eng+deu`).
static RE_OCR_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]+(\+[A-Za-z_]+)*$").unwrap());

/// Configuration for a folder-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use heic2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .input_dir("/Users/me/Desktop/Slides")
///     .max_width(1200)
///     .jpeg_quality(75)
///     .ocr_language("eng+fra")
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr.language, "eng+fra");
/// ```
#[derive(Clone, Serialize)]
pub struct ConversionConfig {
    /// Folder scanned for source photos. Default: `.`.
    pub input_dir: PathBuf,

    /// Output PDF. A relative path is placed inside `input_dir`.
    /// Default: `presentation.pdf`.
    pub output: PathBuf,

    /// Maximum page image width in pixels. Default: 1400.
    ///
    /// Wider photos are scaled down with their aspect ratio preserved;
    /// narrower ones are left alone. Smaller values give smaller PDFs.
    pub max_width: u32,

    /// JPEG quality, 1–100. Default: 80.
    ///
    /// 75–85 keeps phone photos of slides legible at roughly a tenth of the
    /// original HEIC-to-PNG size.
    pub jpeg_quality: u8,

    /// Encode page JPEGs with optimised Huffman tables (smaller, same pixels)
    /// and run the OCR tool at `--optimize 3` instead of 0. Default: true.
    pub optimize: bool,

    /// Accepted file extensions, matched case-insensitively. Default: `["heic"]`.
    pub extensions: Vec<String>,

    /// Page resolution in DPI; sets the physical page size of each image. Default: 100.
    pub resolution_dpi: u32,

    /// Optional `/Title` for the PDF info dictionary.
    pub title: Option<String>,

    /// OCR post-processing settings.
    pub ocr: OcrConfig,

    /// Optional per-file progress callback.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output: PathBuf::from("presentation.pdf"),
            max_width: 1400,
            jpeg_quality: 80,
            optimize: true,
            extensions: vec!["heic".to_string()],
            resolution_dpi: 100,
            title: None,
            ocr: OcrConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("input_dir", &self.input_dir)
            .field("output", &self.output)
            .field("max_width", &self.max_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("optimize", &self.optimize)
            .field("extensions", &self.extensions)
            .field("resolution_dpi", &self.resolution_dpi)
            .field("title", &self.title)
            .field("ocr", &self.ocr)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Where the final PDF lands: `output` itself when absolute, otherwise
    /// `output` joined onto `input_dir`.
    pub fn output_path(&self) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.input_dir.join(&self.output)
        }
    }

    /// Where the pre-OCR PDF is written while OCR runs: `<stem>_temp.pdf`
    /// beside the final output.
    pub fn intermediate_path(&self) -> PathBuf {
        let out = self.output_path();
        let stem = out
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        out.with_file_name(format!("{stem}_temp.pdf"))
    }

    /// Upper-cased, `/`-joined extension list for messages ("HEIC/HEIF").
    pub fn extensions_label(&self) -> String {
        self.extensions
            .iter()
            .map(|e| e.to_uppercase())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn max_width(mut self, px: u32) -> Self {
        self.config.max_width = px.max(1);
        self
    }

    /// Also used as the OCR tool's JPEG quality so a re-optimised PDF does
    /// not undo the chosen compression.
    pub fn jpeg_quality(mut self, q: u8) -> Self {
        let q = q.clamp(1, 100);
        self.config.jpeg_quality = q;
        self.config.ocr.jpeg_quality = q;
        self
    }

    pub fn optimize(mut self, v: bool) -> Self {
        self.config.optimize = v;
        self.config.ocr.optimize_level = if v { 3 } else { 0 };
        self
    }

    /// Replace the accepted extensions. Leading dots are stripped.
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.extensions = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn resolution_dpi(mut self, dpi: u32) -> Self {
        self.config.resolution_dpi = dpi.clamp(36, 600);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn ocr(mut self, enabled: bool) -> Self {
        self.config.ocr.enabled = enabled;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr.backend = backend;
        self
    }

    pub fn ocr_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ocr.tool_path = Some(path.into());
        self
    }

    pub fn ocr_required(mut self, v: bool) -> Self {
        self.config.ocr.required = v;
        self
    }

    pub fn keep_intermediate(mut self, v: bool) -> Self {
        self.config.ocr.keep_intermediate = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Heic2PdfError> {
        let c = &self.config;
        if c.extensions.is_empty() {
            return Err(Heic2PdfError::InvalidConfig(
                "At least one source extension is required".into(),
            ));
        }
        if c.output.as_os_str().is_empty() {
            return Err(Heic2PdfError::InvalidConfig(
                "Output file name must not be empty".into(),
            ));
        }
        if c.ocr.enabled {
            c.ocr.validate()?;
        }
        Ok(self.config)
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Settings for the external OCR post-processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Run OCR after the PDF is assembled. Default: true.
    pub enabled: bool,

    /// Tesseract language code(s), `+`-joined for several. Default: `eng`.
    pub language: String,

    /// Which external tool chain performs OCR. Default: [`OcrBackend::OcrMyPdf`].
    pub backend: OcrBackend,

    /// Explicit path to the backend's main executable. Default: look up on `PATH`.
    pub tool_path: Option<PathBuf>,

    /// Fail the run when OCR fails instead of keeping the plain PDF. Default: false.
    pub required: bool,

    /// Keep the pre-OCR `_temp.pdf` after a successful OCR pass. Default: false.
    pub keep_intermediate: bool,

    /// `ocrmypdf --optimize` level, 0–3. Default: 3.
    pub optimize_level: u8,

    /// `ocrmypdf --jpeg-quality`. Default: 80.
    pub jpeg_quality: u8,

    /// Rasterisation DPI for the tesseract backend's `pdftoppm` step. Default: 150.
    pub raster_dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "eng".to_string(),
            backend: OcrBackend::default(),
            tool_path: None,
            required: false,
            keep_intermediate: false,
            optimize_level: 3,
            jpeg_quality: 80,
            raster_dpi: 150,
        }
    }
}

impl OcrConfig {
    /// Check the language code; called by the builder and by standalone OCR.
    pub fn validate(&self) -> Result<(), Heic2PdfError> {
        if !RE_OCR_LANGUAGE.is_match(&self.language) {
            return Err(Heic2PdfError::InvalidConfig(format!(
                "OCR language must be a code like 'eng' or 'eng+fra', got '{}'",
                self.language
            )));
        }
        if self.optimize_level > 3 {
            return Err(Heic2PdfError::InvalidConfig(format!(
                "OCR optimize level must be 0–3, got {}",
                self.optimize_level
            )));
        }
        Ok(())
    }

    /// The default standalone output name: `<stem>-ocr.pdf` beside `input`.
    pub fn default_output_for(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        input.with_file_name(format!("{stem}-ocr.pdf"))
    }
}

/// External tool chain used to add the hidden text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// `ocrmypdf` in one call. Skips pages that already carry text. (default)
    #[default]
    OcrMyPdf,
    /// `pdftoppm` → `tesseract … pdf` per page → `pdfunite`.
    Tesseract,
}

impl OcrBackend {
    /// Every executable this backend shells out to, main tool first.
    pub fn tools(&self) -> &'static [&'static str] {
        match self {
            OcrBackend::OcrMyPdf => &["ocrmypdf"],
            OcrBackend::Tesseract => &["tesseract", "pdftoppm", "pdfunite"],
        }
    }

    /// How to install a missing tool.
    pub fn install_hint(tool: &str) -> String {
        match tool {
            "ocrmypdf" => "Install it with: brew install ocrmypdf  (or: apt install ocrmypdf / pipx install ocrmypdf)".to_string(),
            "tesseract" => "Install it with: brew install tesseract  (or: apt install tesseract-ocr)".to_string(),
            "pdftoppm" | "pdfunite" => {
                "Install Poppler with: brew install poppler  (or: apt install poppler-utils)".to_string()
            }
            other => format!("Make sure '{other}' is installed and on your PATH."),
        }
    }
}

impl fmt::Display for OcrBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrBackend::OcrMyPdf => f.write_str("ocrmypdf"),
            OcrBackend::Tesseract => f.write_str("tesseract"),
        }
    }
}
