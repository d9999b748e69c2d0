//! Fixed-layout inspection report extraction
//!
//! This crate converts reception inspection reports (PDF documents with
//! tables and embedded images) into typed records:
//! - Row extraction: PDF tables to a flat cell matrix, plus embedded images
//! - Report parsing: keyword-anchored scan of the matrix into a `Report`
//!   with coerced integer, percentage, date, and free-text fields

pub mod coerce;
pub mod model;
pub mod parser;
pub mod rows;

pub use coerce::CoerceError;
pub use model::{ChapadurHardboard, MarcosDeMadera, PalletsArlog, Report};
pub use parser::parse_matrix;
pub use rows::{extract_rows, extract_rows_mem, ExtractedDocument, ImageBlob};

use std::path::Path;
use std::time::Instant;

/// High-level report processing result
#[derive(Debug)]
pub struct ReportProcessResult {
    /// The parsed report
    pub report: Report,
    /// Embedded images, passed through unchanged
    pub images: Vec<ImageBlob>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Process a report PDF: extract rows and images, then parse the report
pub fn process_report<P: AsRef<Path>>(path: P) -> Result<ReportProcessResult, ReportError> {
    let start = Instant::now();
    let extracted = rows::extract_rows(path)?;
    parse_extracted(extracted, start)
}

/// Process a report PDF from a memory buffer
pub fn process_report_mem(buffer: &[u8]) -> Result<ReportProcessResult, ReportError> {
    let start = Instant::now();
    let extracted = rows::extract_rows_mem(buffer)?;
    parse_extracted(extracted, start)
}

fn parse_extracted(
    extracted: ExtractedDocument,
    start: Instant,
) -> Result<ReportProcessResult, ReportError> {
    let report = parser::parse_matrix(&extracted.matrix)?;
    Ok(ReportProcessResult {
        report,
        images: extracted.images,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Pdf(String),
    /// A required top-level field or section header never appeared in the
    /// matrix
    #[error("required field or section never found: {0}")]
    MissingField(&'static str),
    /// An anchor was found but its expected data row is absent or too short
    #[error("{section}: data row {row} is missing or too short")]
    MalformedDataRow { section: &'static str, row: usize },
    /// A cell's text does not match the expected field format
    #[error("cannot coerce {field} from {value:?} at row {row}, column {col}: {source}")]
    Coercion {
        field: &'static str,
        value: String,
        row: usize,
        col: usize,
        #[source]
        source: CoerceError,
    },
}

impl From<lopdf::Error> for ReportError {
    fn from(e: lopdf::Error) -> Self {
        ReportError::Pdf(e.to_string())
    }
}
