// PDF documents via the pure-Rust `pdf-extract` crate.
//
// Malformed PDFs can make the parser panic rather than return an error. A
// panic here must not take the worker pool down with it, so extraction runs
// under catch_unwind and a panic is reported like any other failure.
//
// The parser opens every page with a blank line. Left alone, that blank line
// would end any paragraph running across a page break, so pages are trimmed
// and terminated with a single newline the same way text pages are.

use std::panic;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::error::DocumentExtractionError;

use super::traits::PageExtractor;

/// Reads the text layer of `.pdf` files, one string per page.
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, DocumentExtractionError> {
        let pages =
            read_pdf_pages(path).map_err(|e| DocumentExtractionError::new(path, format!("{e:#}")))?;
        debug!(path = %path.display(), pages = pages.len(), "Extracted PDF text");
        Ok(pages)
    }
}

fn read_pdf_pages(path: &Path) -> Result<Vec<String>> {
    match panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path)) {
        Ok(result) => {
            let pages = result.context("PDF text extraction failed")?;
            Ok(pages.iter().map(|page| normalize_page(page)).collect())
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow!("PDF parser panicked: {message}"))
        }
    }
}

/// Strip the leading line breaks and trailing whitespace of one page and end
/// it with exactly one newline. A page with no text becomes empty.
fn normalize_page(page: &str) -> String {
    let body = page.trim_start_matches(['\n', '\r']).trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}
