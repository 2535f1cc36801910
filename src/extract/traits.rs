// PageExtractor trait: swap-ready abstraction over document readers.
//
// Like the similarity and segmentation policies, the reader is injected so
// tests can feed synthetic pages (or synthetic failures) without touching
// real PDF files.

use std::path::Path;

use crate::error::DocumentExtractionError;

use super::pdf::PdfExtractor;
use super::text::PlainTextExtractor;

/// Reads a document and returns its raw text, one string per page.
pub trait PageExtractor: Send + Sync {
    /// Extract the pages of the document at `path`, in page order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, DocumentExtractionError>;
}

/// Dispatches on file extension: `.pdf` to the PDF reader, `.txt` to the
/// plain-text reader. Anything else is an extraction failure.
pub struct ExtensionExtractor {
    pdf: PdfExtractor,
    text: PlainTextExtractor,
}

impl Default for ExtensionExtractor {
    fn default() -> Self {
        Self {
            pdf: PdfExtractor,
            text: PlainTextExtractor,
        }
    }
}

impl PageExtractor for ExtensionExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, DocumentExtractionError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => self.pdf.extract_pages(path),
            Some("txt") => self.text.extract_pages(path),
            _ => Err(DocumentExtractionError::new(
                path,
                "unsupported file type (expected .pdf or .txt)",
            )),
        }
    }
}
