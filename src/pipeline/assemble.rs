//! PDF assembly: one JPEG per page, in the order pages are pushed.
//!
//! Each page is an image XObject with `/Filter /DCTDecode`, so the JPEG
//! produced by [`super::encode`] is copied into the file byte for byte. The
//! page's MediaBox is the image size at `resolution_dpi`, and the content
//! stream just scales the image to fill it.
//!
//! ```text
//! Catalog ─▶ Pages ─┬─▶ Page 1 ─▶ Contents ("q W 0 0 H 0 0 cm /Im1 Do Q")
//!                   │          └▶ Resources/XObject/Im1 (JPEG)
//!                   └─▶ Page 2 …
//! ```

use super::encode::NormalizedPage;
use crate::error::Heic2PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, info};

const POINTS_PER_INCH: f32 = 72.0;

/// Accumulates pages into a PDF document.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    resolution_dpi: f32,
    optimize: bool,
    title: Option<String>,
}

impl PdfAssembler {
    pub fn new(resolution_dpi: u32, optimize: bool) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            resolution_dpi: resolution_dpi.max(1) as f32,
            optimize,
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Page size in points for an image of `px` pixels.
    fn to_points(&self, px: u32) -> f32 {
        px as f32 * POINTS_PER_INCH / self.resolution_dpi
    }

    /// Append `page` after every page pushed so far.
    pub fn push_page(&mut self, page: &NormalizedPage) -> Result<(), Heic2PdfError> {
        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => page.width as i64,
            "Height" => page.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let image_id = self
            .doc
            .add_object(Stream::new(image_dict, page.jpeg.clone()).with_compression(false));

        let (w_pt, h_pt) = (self.to_points(page.width), self.to_points(page.height));
        let image_name = format!("Im{}", self.kids.len() + 1);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        w_pt.into(),
                        0.into(),
                        0.into(),
                        h_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(image_name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| Heic2PdfError::PdfAssembly(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let mut xobjects = lopdf::Dictionary::new();
        xobjects.set(image_name.as_bytes().to_vec(), image_id);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w_pt.into(), h_pt.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.kids.push(page_id.into());

        debug!(
            "Page {} ← {} ({}x{} px, {:.1}x{:.1} pt)",
            self.kids.len(),
            page.source.display(),
            page.width,
            page.height,
            w_pt,
            h_pt
        );
        Ok(())
    }

    /// Close the page tree and serialise the document.
    ///
    /// # Errors
    /// [`Heic2PdfError::NoPagesProduced`] when no page was pushed.
    pub fn finish(mut self) -> Result<Vec<u8>, Heic2PdfError> {
        if self.kids.is_empty() {
            return Err(Heic2PdfError::NoPagesProduced {
                total: 0,
                first_error: "no pages were added".to_string(),
            });
        }

        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => std::mem::take(&mut self.kids),
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(concat!("heic2pdf ", env!("CARGO_PKG_VERSION"))),
        };
        if let Some(ref title) = self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        if self.optimize {
            self.doc.prune_objects();
            self.doc.compress();
        }

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| Heic2PdfError::PdfAssembly(e.to_string()))?;
        info!("Assembled PDF: {} pages, {} bytes", count, bytes.len());
        Ok(bytes)
    }

    /// Serialise and write to `path` atomically (temp file + rename),
    /// creating parent directories. Returns the number of bytes written.
    pub fn write_to(self, path: &Path) -> Result<u64, Heic2PdfError> {
        let bytes = self.finish()?;
        write_atomic(path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

/// Write `bytes` to `<path>.tmp`, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Heic2PdfError> {
    let write_failed = |source| Heic2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    std::fs::write(&tmp_path, bytes).map_err(write_failed)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        write_failed(e)
    })
}

/// Count the pages of a PDF on disk.
pub fn count_pages(path: &Path) -> Result<usize, lopdf::Error> {
    Ok(Document::load(path)?.get_pages().len())
}
