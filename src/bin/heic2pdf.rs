//! CLI binary for heic2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use heic2pdf::{
    convert, ocr_existing_pdf, pdf_page_count, ConversionConfig, ConversionProgressCallback,
    OcrBackend, OcrConfig, OcrOutcome, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn elapsed_secs(start: &Mutex<Option<Instant>>) -> f64 {
    start
        .lock()
        .ok()
        .and_then(|mut s| s.take())
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar at the bottom of the terminal and
/// one log line per photo above it.
struct CliProgressCallback {
    bar: ProgressBar,
    file_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until discovery reports the file count.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for photos…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} photos  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} photos"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        if let Ok(mut s) = self.file_started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(display_name(path));
    }

    fn on_file_complete(
        &self,
        index: usize,
        total: usize,
        path: &Path,
        width: u32,
        height: u32,
        jpeg_bytes: usize,
    ) {
        let secs = elapsed_secs(&self.file_started);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<28}  {}  {}",
            green("✓"),
            index,
            total,
            display_name(path),
            dim(&format!("{width}x{height}  {:>6} KB", jpeg_bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, _path: &Path, error: &str) {
        let secs = elapsed_secs(&self.file_started);

        // Keep one line per file; libheif messages can be long.
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_pdf_written(&self, path: &Path, pages: usize, bytes: u64) {
        self.bar.println(format!(
            "{} Created {} {}",
            cyan("◆"),
            bold(&path.display().to_string()),
            dim(&format!(
                "({pages} pages, {:.2} MB)",
                bytes as f64 / BYTES_PER_MB
            )),
        ));
    }

    fn on_ocr_start(&self, language: &str) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.set_prefix("OCR");
        self.bar.set_message(format!(
            "Applying OCR (language: {language})… this may take a few minutes"
        ));
    }

    fn on_ocr_complete(&self, outcome: &OcrOutcome) {
        match outcome {
            OcrOutcome::Applied { duration_ms, .. } => self.bar.println(format!(
                "{} OCR completed {}",
                green("✔"),
                dim(&format!("{:.1}s", *duration_ms as f64 / 1000.0))
            )),
            OcrOutcome::Failed { error } => {
                self.bar
                    .println(format!("{} OCR failed: {}", red("✘"), red(error)));
                self.bar.println(format!(
                    "  {}",
                    dim("Kept the non-OCR PDF at the output path.")
                ));
            }
            OcrOutcome::Skipped => {}
        }
    }

    fn on_conversion_complete(&self, total_files: usize, pages: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(pages);
        if failed == 0 {
            eprintln!(
                "{} {} photos converted successfully",
                green("✔"),
                bold(&pages.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} photos converted  ({} skipped)",
                cyan("⚠"),
                bold(&pages.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

/// Plain-text reporting for `--no-progress`: one line per photo, no bar.
struct PlainProgressCallback;

impl ConversionProgressCallback for PlainProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        eprintln!("Found {total_files} photos");
    }

    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        eprintln!("Processing {index}/{total}: {}", display_name(path));
    }

    fn on_file_error(&self, index: usize, total: usize, _path: &Path, error: &str) {
        eprintln!("  Skipped {index}/{total}: {error}");
    }

    fn on_ocr_start(&self, language: &str) {
        eprintln!("\nApplying OCR (language: {language})...");
        eprintln!("This may take a few minutes...");
    }

    fn on_ocr_complete(&self, outcome: &OcrOutcome) {
        match outcome {
            OcrOutcome::Applied { .. } => eprintln!("OCR completed successfully!"),
            OcrOutcome::Failed { error } => {
                eprintln!("OCR failed: {error}");
                eprintln!("Keeping non-OCR PDF");
            }
            OcrOutcome::Skipped => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every .heic/.HEIC in the current folder to ./presentation.pdf
  heic2pdf

  # Another folder, custom output, smaller file
  heic2pdf ~/Desktop/Slides -o ~/Desktop/slides.pdf --max-width 1200 --quality 70

  # No OCR
  heic2pdf ~/Desktop/Slides --no-ocr

  # OCR in English and German with the tesseract + poppler tool chain
  heic2pdf ~/Desktop/Slides -l eng+deu --ocr-backend tesseract

  # Add a text layer to an existing PDF (writes slides-ocr.pdf)
  heic2pdf --ocr-only slides.pdf

  # Machine-readable result
  heic2pdf ~/Desktop/Slides --json > result.json

OCR TOOLS:
  ocrmypdf   brew install ocrmypdf         apt install ocrmypdf
  tesseract  brew install tesseract poppler apt install tesseract-ocr poppler-utils

  If the OCR tool is missing or fails, the plain PDF is kept and the run
  still succeeds unless --ocr-required is set.

HEIC SUPPORT:
  HEIC decoding uses the system libheif (brew install libheif /
  apt install libheif-dev). Photos that cannot be decoded are reported
  and skipped; the rest of the folder is still converted.

ENVIRONMENT VARIABLES:
  HEIC2PDF_INPUT, HEIC2PDF_OUTPUT, HEIC2PDF_MAX_WIDTH, HEIC2PDF_QUALITY,
  HEIC2PDF_OCR_LANG, HEIC2PDF_OCR_BACKEND, ... mirror the flags above.
  RUST_LOG overrides the log filter (e.g. RUST_LOG=heic2pdf=debug).
"#;

/// Convert a folder of HEIC photos into one compressed, searchable PDF.
#[derive(Parser, Debug)]
#[command(
    name = "heic2pdf",
    version,
    about = "Convert a folder of HEIC photos into one compressed, searchable PDF",
    long_about = "Scan a folder for HEIC photos, shrink and re-encode each one as JPEG, \
combine them into a single PDF in file-name order, and optionally run OCR so the PDF \
can be searched.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the photos (or the PDF, with --ocr-only).
    #[arg(env = "HEIC2PDF_INPUT", default_value = ".")]
    input: PathBuf,

    /// Output PDF; a relative path is placed inside the input folder.
    /// Default: presentation.pdf (or <input>-ocr.pdf with --ocr-only).
    #[arg(short, long, env = "HEIC2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum page image width in pixels; wider photos are scaled down.
    #[arg(long, env = "HEIC2PDF_MAX_WIDTH", default_value_t = 1400,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_width: u32,

    /// JPEG quality 1–100 (lower = smaller file, try 75–85).
    #[arg(long, env = "HEIC2PDF_QUALITY", default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Use the standard JPEG Huffman tables instead of per-image optimised
    /// ones, and run the OCR tool with --optimize 0.
    #[arg(long, env = "HEIC2PDF_NO_OPTIMIZE")]
    no_optimize: bool,

    /// Skip OCR; the PDF will not be searchable.
    #[arg(long, env = "HEIC2PDF_NO_OCR")]
    no_ocr: bool,

    /// OCR language code(s), e.g. eng, spa, fra, deu, or eng+fra.
    #[arg(short, long, env = "HEIC2PDF_OCR_LANG", default_value = "eng")]
    lang: String,

    /// OCR tool chain.
    #[arg(long, env = "HEIC2PDF_OCR_BACKEND", value_enum, default_value = "ocrmypdf")]
    ocr_backend: OcrBackendArg,

    /// Path to the OCR executable (ocrmypdf or tesseract) if not on PATH.
    #[arg(long, env = "HEIC2PDF_OCR_TOOL")]
    ocr_tool: Option<PathBuf>,

    /// Fail the run if OCR fails (the plain PDF is still kept).
    #[arg(long, env = "HEIC2PDF_OCR_REQUIRED")]
    ocr_required: bool,

    /// Keep the pre-OCR <name>_temp.pdf next to the output.
    #[arg(long)]
    keep_intermediate: bool,

    /// Only add a text layer to the PDF given as INPUT.
    #[arg(long)]
    ocr_only: bool,

    /// Accepted photo extensions (comma-separated or repeated).
    #[arg(long = "ext", env = "HEIC2PDF_EXT", value_delimiter = ',', default_value = "heic")]
    extensions: Vec<String>,

    /// Page resolution in DPI (sets the physical page size).
    #[arg(long, env = "HEIC2PDF_DPI", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// PDF document title.
    #[arg(long, env = "HEIC2PDF_TITLE")]
    title: Option<String>,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "HEIC2PDF_JSON")]
    json: bool,

    /// Disable the progress bar; print plain lines instead.
    #[arg(long, env = "HEIC2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HEIC2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HEIC2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrBackendArg {
    Ocrmypdf,
    Tesseract,
}

impl From<OcrBackendArg> for OcrBackend {
    fn from(v: OcrBackendArg) -> Self {
        match v {
            OcrBackendArg::Ocrmypdf => OcrBackend::OcrMyPdf,
            OcrBackendArg::Tesseract => OcrBackend::Tesseract,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already reports every file.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── OCR-only mode ────────────────────────────────────────────────────
    if cli.ocr_only {
        return run_ocr_only(&cli).await;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else if !cli.quiet && !cli.json {
        Some(Arc::new(PlainProgressCallback) as ProgressCallback)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&config).await.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!();
        eprintln!(
            "{}  PDF created: {}",
            if stats.failed_files == 0 && !matches!(output.ocr, OcrOutcome::Failed { .. }) {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&output.output_path.display().to_string()),
        );
        eprintln!("   Pages:            {}", output.page_count());
        eprintln!("   File size:        {:.2} MB", stats.output_mb());
        eprintln!("   Average per page: {:.2} MB", stats.average_mb_per_page());
        if output.ocr.is_applied() {
            eprintln!("   PDF is searchable with an OCR text layer");
        }
        for failed in output.failures() {
            if let Some(ref e) = failed.error {
                eprintln!("   {} {}", red("skipped"), e);
            }
        }
    }

    Ok(())
}

/// `--ocr-only`: add a text layer to an existing PDF.
async fn run_ocr_only(cli: &Cli) -> Result<()> {
    let ocr = OcrConfig {
        enabled: true,
        language: cli.lang.clone(),
        backend: cli.ocr_backend.clone().into(),
        tool_path: cli.ocr_tool.clone(),
        required: true,
        keep_intermediate: false,
        optimize_level: if cli.no_optimize { 0 } else { 3 },
        jpeg_quality: cli.quality,
        ..OcrConfig::default()
    };

    let spinner = (!cli.quiet && !cli.no_progress).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("OCR");
        bar.set_message(format!("{} (language: {})", cli.input.display(), ocr.language));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = ocr_existing_pdf(&cli.input, cli.output.as_deref(), &ocr).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.context("OCR failed")?;

    if !cli.quiet {
        let pages = pdf_page_count(&output).context("Failed to read OCR output")?;
        let bytes = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        eprintln!(
            "{}  OCR complete: {}  {}",
            green("✔"),
            bold(&output.display().to_string()),
            dim(&format!("({pages} pages, {:.2} MB)", bytes as f64 / BYTES_PER_MB)),
        );
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .input_dir(&cli.input)
        .max_width(cli.max_width)
        .jpeg_quality(cli.quality)
        .optimize(!cli.no_optimize)
        .extensions(&cli.extensions)
        .resolution_dpi(cli.dpi)
        .ocr(!cli.no_ocr)
        .ocr_language(&cli.lang)
        .ocr_backend(cli.ocr_backend.clone().into())
        .ocr_required(cli.ocr_required)
        .keep_intermediate(cli.keep_intermediate);

    if let Some(ref output) = cli.output {
        builder = builder.output(output);
    }
    if let Some(ref tool) = cli.ocr_tool {
        builder = builder.ocr_tool_path(tool);
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
