// Plain-text documents: the format produced by `pdftotext` and friends.
//
// Pages are separated by form feeds. Each page is terminated with a newline
// so that concatenating pages behaves like a PDF text layer, where a page's
// last line never runs into the next page's first line.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::DocumentExtractionError;

use super::traits::PageExtractor;

const PAGE_BREAK: char = '\u{c}';

/// Reads `.txt` files, splitting pages on form feed.
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, DocumentExtractionError> {
        let bytes = fs::read(path).map_err(|e| DocumentExtractionError::new(path, e.to_string()))?;
        // Legacy exports are often Latin-1 or mixed; replacement chars beat a failed document
        let text = String::from_utf8_lossy(&bytes);
        let pages = split_pages(&text);
        debug!(path = %path.display(), pages = pages.len(), "Read plain-text document");
        Ok(pages)
    }
}

/// Split text on form feeds, dropping the empty page after a trailing break.
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text
        .split(PAGE_BREAK)
        .map(|page| {
            let mut page = page.to_string();
            if !page.is_empty() && !page.ends_with('\n') {
                page.push('\n');
            }
            page
        })
        .collect();

    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    if pages.len() == 1 && pages[0].is_empty() {
        pages.clear();
    }
    pages
}
