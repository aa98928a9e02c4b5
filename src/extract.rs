use std::path::Path;

use lopdf::Document as PdfDocument;

use crate::error::{Error, Result, Stage};

/// Default number of leading pages read from each document.
pub const DEFAULT_MAX_PAGES: usize = 5;

/// Converts a document file into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of at most the first `max_pages` pages of `path`.
    fn extract(&self, path: &Path, max_pages: usize) -> Result<String>;
}

/// Text extraction for PDF files backed by `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path, max_pages: usize) -> Result<String> {
        let doc = PdfDocument::load(path)
            .map_err(|e| Error::collaborator(Stage::Extract, path, e))?;

        // Page numbers are 1-based and come back ordered from the BTreeMap.
        let page_numbers: Vec<u32> =
            doc.get_pages().keys().copied().take(max_pages).collect();

        let mut text = String::new();
        for page in page_numbers {
            match doc.extract_text(&[page]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    if !page_text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        page,
                        error = %e,
                        "skipping page without extractable text"
                    );
                }
            }
        }

        Ok(text)
    }
}
