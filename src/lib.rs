//! Locate known field values on rendered PDF pages
//!
//! This crate provides:
//! - Positioned text extraction per page
//! - Heuristic detection of the ship-to block and line-item rows
//! - Format-aware matching of field values (dates, money amounts)
//! - Page / display / raster coordinate transforms
//! - Draw commands for a highlight overlay and a magnifying lens

pub mod cache;
pub mod controller;
pub mod draw;
pub mod extractor;
pub mod geometry;
pub mod lens;
pub mod matcher;
pub mod overlay;
pub mod patterns;
pub mod regions;
pub mod settings;
pub mod transform;

pub use cache::{PageKey, PageTextCache, PageTextData};
pub use controller::{HighlightController, RequestStatus};
pub use extractor::{extract_tokens, MemoryPage, PageTextSource, PdfDocument, TextRun, Token};
pub use geometry::{Rect, Region};
pub use matcher::{find_match, ColumnHint, FieldType, HighlightRequest, MatchOutcome, MatchResult};
pub use settings::LocatorConfig;

use std::path::Path;

/// Result of locating one field value in a PDF file
#[derive(Debug)]
pub struct LocateResult {
    /// Match and failure diagnostic
    pub outcome: MatchOutcome,
    /// Extracted text and regions of the searched page
    pub page: PageTextData,
    /// Number of pages in the document
    pub page_count: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Locate a field value on one page of a PDF file
pub fn locate_in_pdf<P: AsRef<Path>>(
    path: P,
    page_num: u32,
    request: &HighlightRequest,
) -> Result<LocateResult, LocatorError> {
    let start = std::time::Instant::now();

    let doc = PdfDocument::load(path)?;
    let source = doc.page(page_num)?;
    let page = PageTextData::from_tokens(extract_tokens(&source)?);
    let outcome = find_match(request, &page, &settings::MatchConfig::default());

    Ok(LocateResult {
        outcome,
        page,
        page_count: doc.page_count(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Page {0} not found")]
    PageNotFound(u32),
    #[error("Text extraction failed: {0}")]
    Extraction(String),
    #[error("Settings storage error: {0}")]
    Storage(String),
}

impl From<lopdf::Error> for LocatorError {
    fn from(e: lopdf::Error) -> Self {
        LocatorError::Parse(e.to_string())
    }
}
