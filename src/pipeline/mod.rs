//! Pipeline stages for HEIC-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ decode ──▶ normalize ──▶ encode ──▶ assemble ──▶ ocr
//! (folder)     (libheif)  (RGB, resize)  (JPEG)     (lopdf)      (external)
//! ```
//!
//! 1. [`discover`]  list matching files in name order
//! 2. [`decode`]    HEIC/HEIF via libheif, other formats via `image`,
//!    orientation applied
//! 3. [`normalize`] RGB8, shrink to the maximum width
//! 4. [`encode`]    quality-controlled JPEG
//! 5. [`assemble`]  one DCT image per page, written atomically
//! 6. [`ocr`]       optional text layer through ocrmypdf or tesseract

pub mod assemble;
pub mod decode;
pub mod discover;
pub mod encode;
pub mod normalize;
pub mod ocr;
