//! File discovery: list the input folder and keep the photos to convert.
//!
//! The listing is non-recursive and sorted by file name so that page order
//! is stable across runs and platforms (directory iteration order is not).
//! Extension matching is case-insensitive: iPhones write `.HEIC`, AirDrop
//! and some exporters write `.heic`.

use crate::error::Heic2PdfError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether `path` carries one of `extensions` (lower-case, no dot).
pub fn has_accepted_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// macOS leaves `._NAME` AppleDouble companions on non-HFS volumes; they
/// share the photo's extension but hold only resource-fork metadata.
fn is_apple_double(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("._"))
        .unwrap_or(false)
}

/// List the files in `dir` whose extension is accepted, sorted by file name.
///
/// # Errors
/// * [`Heic2PdfError::InputDirNotFound`]: `dir` is missing or not a directory
/// * [`Heic2PdfError::InputDirUnreadable`]: listing failed
/// * [`Heic2PdfError::NoSourceFiles`]: nothing matched
pub fn discover_sources(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, Heic2PdfError> {
    if !dir.is_dir() {
        return Err(Heic2PdfError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let unreadable = |source: std::io::Error| Heic2PdfError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if !path.is_file() || is_apple_double(&path) {
            continue;
        }
        if has_accepted_extension(&path, extensions) {
            sources.push(path);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }

    if sources.is_empty() {
        return Err(Heic2PdfError::NoSourceFiles {
            path: dir.to_path_buf(),
            extensions: extensions
                .iter()
                .map(|e| e.to_uppercase())
                .collect::<Vec<_>>()
                .join("/"),
        });
    }

    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    info!("Found {} source files in {}", sources.len(), dir.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn matches_extension_case_insensitively() {
        let heic = vec!["heic".to_string()];
        assert!(has_accepted_extension(Path::new("a.heic"), &heic));
        assert!(has_accepted_extension(Path::new("a.HEIC"), &heic));
        assert!(has_accepted_extension(Path::new("a.HeIc"), &heic));
        assert!(!has_accepted_extension(Path::new("a.jpg"), &heic));
        assert!(!has_accepted_extension(Path::new("heic"), &heic));
    }

    #[test]
    fn lists_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "IMG_0003.HEIC");
        touch(tmp.path(), "IMG_0001.heic");
        touch(tmp.path(), "IMG_0002.HEIC");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "._IMG_0001.heic");
        std::fs::create_dir(tmp.path().join("sub.heic")).unwrap();

        let found = discover_sources(tmp.path(), &["heic".to_string()]).unwrap();
        assert_eq!(
            names(&found),
            vec!["IMG_0001.heic", "IMG_0002.HEIC", "IMG_0003.HEIC"]
        );
    }

    #[test]
    fn several_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.heif");
        touch(tmp.path(), "a.heic");
        touch(tmp.path(), "c.png");

        let exts = vec!["heic".to_string(), "heif".to_string()];
        let found = discover_sources(tmp.path(), &exts).unwrap();
        assert_eq!(names(&found), vec!["a.heic", "b.heif"]);
    }

    #[test]
    fn empty_folder_is_no_source_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "readme.md");
        let err = discover_sources(tmp.path(), &["heic".to_string()]).unwrap_err();
        match err {
            Heic2PdfError::NoSourceFiles { extensions, .. } => assert_eq!(extensions, "HEIC"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_folder() {
        let tmp = TempDir::new().unwrap();
        let err = discover_sources(&tmp.path().join("nope"), &["heic".to_string()]).unwrap_err();
        assert!(matches!(err, Heic2PdfError::InputDirNotFound { .. }));
    }
}
