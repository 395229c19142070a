use std::path::Path;

use crate::error::ExtractError;
use crate::extractor::{DocumentFormat, DocumentProcessor, ExtractedText};

pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for PdfProcessor {
    fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError> {
        let _span = tracing::info_span!("extractor.pdf").entered();

        let pdf_bytes = std::fs::read(path).map_err(|e| ExtractError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })?;

        let doc = lopdf::Document::load_mem(&pdf_bytes)
            .map_err(|e| ExtractError::Pdf(format!("Failed to load PDF: {}", e)))?;

        Ok(extract_text_from_pdf(&doc))
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

/// Concatenates page text in page order, one newline after each page.
/// Pages lopdf cannot decode are skipped and reported in `skipped_pages`.
fn extract_text_from_pdf(doc: &lopdf::Document) -> ExtractedText {
    let pages = doc.get_pages();
    let mut text = String::new();
    let mut skipped_pages = Vec::new();

    for (page_num, _) in &pages {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                log::warn!("Skipping PDF page {}: {}", page_num, e);
                skipped_pages.push(*page_num);
            }
        }
    }

    let mut extracted = ExtractedText::new(text, DocumentFormat::Pdf);
    extracted.page_count = Some(pages.len());
    extracted.skipped_pages = skipped_pages;
    extracted
}
