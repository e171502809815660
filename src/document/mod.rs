//! Document loading: turn a file on disk into ordered page texts.
//!
//! [`DocumentLoader`] is the seam the pipeline depends on. [`PdfLoader`] is
//! the production implementation; [`PlainTextLoader`] reads `.txt`/`.md`
//! files with form feeds as page breaks. [`FormatLoader`] picks between them
//! by file extension.

pub mod chunker;
pub mod pdf;

use std::path::Path;

use crate::error::LoadError;

pub use chunker::{Chunk, TextSplitter};
pub use pdf::PdfLoader;

/// Text of one page, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

impl PageText {
    pub fn new(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Loads a document into page-level text segments.
pub trait DocumentLoader: Send + Sync {
    /// Load `path`. Pages come back in document order; empty pages are kept.
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError>;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Plain UTF-8 text; `\x0C` separates pages.
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError> {
        let data = read_document(path)?;
        let text = String::from_utf8_lossy(&data);
        let pages: Vec<PageText> = text
            .split('\x0C')
            .enumerate()
            .map(|(page, text)| PageText::new(page, text))
            .collect();
        ensure_text(pages, path)
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// Dispatches on the file extension; anything unrecognised is treated as PDF.
#[derive(Default)]
pub struct FormatLoader;

impl FormatLoader {
    fn loader_for(path: &Path) -> &'static dyn DocumentLoader {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("txt" | "md" | "text") => &PlainTextLoader,
            _ => &PdfLoader,
        }
    }
}

impl DocumentLoader for FormatLoader {
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError> {
        let loader = Self::loader_for(path);
        tracing::debug!(loader = loader.name(), path = %path.display(), "loading document");
        loader.load(path)
    }

    fn name(&self) -> &str {
        "auto"
    }
}

/// Read a file, mapping a missing path to [`LoadError::NotFound`].
pub(crate) fn read_document(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.display().to_string(),
        },
        _ => LoadError::Io {
            path: path.display().to_string(),
            source: e,
        },
    })
}

/// Reject documents where no page carries any text.
pub(crate) fn ensure_text(pages: Vec<PageText>, path: &Path) -> Result<Vec<PageText>, LoadError> {
    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(LoadError::EmptyDocument {
            path: path.display().to_string(),
        });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_splits_on_form_feed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "page one\x0Cpage two\x0C").unwrap();

        let pages = FormatLoader.load(&path).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], PageText::new(0, "page one"));
        assert_eq!(pages[1], PageText::new(1, "page two"));
        assert!(pages[2].text.is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = FormatLoader
            .load(Path::new("/nonexistent/lecture.pdf"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn whitespace_only_document_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blank.md");
        std::fs::write(&path, "  \n\x0C\t").unwrap();
        let err = FormatLoader.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::EmptyDocument { .. }));
    }

    #[test]
    fn unknown_extension_goes_to_pdf() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("upload.bin");
        std::fs::write(&path, b"This is not a PDF").unwrap();
        let err = FormatLoader.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
