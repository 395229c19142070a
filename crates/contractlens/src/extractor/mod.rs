//! Plain-text extraction from uploaded contract documents.
//!
//! Each supported format is one [`DocumentProcessor`] registered in the
//! [`ExtractorRegistry`]; supporting a new format means adding a
//! [`DocumentFormat`] variant and a processor for it.

pub mod docx;
pub mod pdf;
pub mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Documents with fewer characters than this (after trimming) are not sent
/// to the generation service.
pub const MIN_ANALYZABLE_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Text => "txt",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text pulled out of one document.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub format: DocumentFormat,
    /// Number of pages for paginated formats.
    pub page_count: Option<usize>,
    /// Pages whose text could not be extracted and were skipped.
    pub skipped_pages: Vec<u32>,
}

impl ExtractedText {
    pub fn new(text: String, format: DocumentFormat) -> Self {
        Self {
            text,
            format,
            page_count: None,
            skipped_pages: Vec::new(),
        }
    }

    /// Character count (not bytes) of the extracted text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

pub trait DocumentProcessor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

pub struct ExtractorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        let processors: Vec<Box<dyn DocumentProcessor>> = vec![
            Box::new(text::TextProcessor::new()),
            Box::new(pdf::PdfProcessor::new()),
            Box::new(docx::DocxProcessor::new()),
        ];

        Self { processors }
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let format = DocumentFormat::from_extension(extension)
            .ok_or_else(|| ExtractError::UnsupportedFormat(extension.to_string()))?;

        for processor in &self.processors {
            if processor.supports(format) {
                return processor.extract(path);
            }
        }

        Err(ExtractError::UnsupportedFormat(extension.to_string()))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects text too short to be worth analyzing (image-only or empty documents).
pub fn ensure_analyzable(text: &str) -> Result<(), ExtractError> {
    let chars = text.trim().chars().count();
    if chars < MIN_ANALYZABLE_CHARS {
        return Err(ExtractError::TooShort { chars });
    }
    Ok(())
}

/// True when the file name carries an extension the registry can handle.
pub fn is_supported_file_name(file_name: &str) -> bool {
    DocumentFormat::from_path(Path::new(file_name)).is_some()
}
