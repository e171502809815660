//! PDF loader backed by `pdf-extract`.
//!
//! Text is extracted page by page and NFKC-normalized so ligatures and
//! compatibility forms (`ﬁ`, full-width digits) become plain characters
//! before chunking and embedding.

use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::document::{DocumentLoader, PageText, ensure_text, read_document};
use crate::error::LoadError;

/// PDF document loader.
pub struct PdfLoader;

impl PdfLoader {
    /// Extract page texts from in-memory PDF bytes. `origin` names the
    /// document in errors.
    pub fn parse(&self, data: &[u8], origin: &str) -> Result<Vec<PageText>, LoadError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(data).map_err(|e| {
            LoadError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page, text)| PageText::new(page, text.nfkc().collect::<String>()))
            .collect())
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<PageText>, LoadError> {
        let data = read_document(path)?;
        let pages = self.parse(&data, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF text");
        ensure_text(pages, path)
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_bytes_are_a_parse_error() {
        // pdf-extract needs real PDF bytes; only the failure path is testable
        // without a fixture.
        let err = PdfLoader.parse(b"This is not a PDF", "upload.pdf").unwrap_err();
        match err {
            LoadError::Parse { path, .. } => assert_eq!(path, "upload.pdf"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn missing_pdf_is_not_found() {
        let err = PdfLoader.load(Path::new("/nonexistent/slides.pdf")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
