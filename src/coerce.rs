//! Value coercion primitives
//!
//! Pure parsers for the string formats found in report cells: thousands-grouped
//! integers, comma-decimal percentages, dd/mm/yyyy dates, and the two-line
//! discard-reason label. Each failure carries its own variant so a malformed
//! label is diagnosable separately from a bad number.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A cell's text did not match the expected format
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("not an integer: {0:?}")]
    Int(String),
    #[error("not a percentage: {0:?}")]
    Percentage(String),
    #[error("not a dd/mm/yyyy date: {0:?}")]
    Date(String),
    #[error("label cell does not carry a \"descarte: \" line: {0:?}")]
    MotivoFormat(String),
}

/// Parse an integer cell, tolerating spaces and comma grouping ("1,234" → 1234)
pub fn parse_int(value: &str) -> Result<i64, CoerceError> {
    let stripped: String = value.chars().filter(|&c| c != ' ' && c != ',').collect();
    stripped
        .parse::<i64>()
        .map_err(|_| CoerceError::Int(value.to_string()))
}

/// Parse a percentage cell with comma decimal separator ("3,5%" → 3.5)
pub fn parse_percentage(value: &str) -> Result<f64, CoerceError> {
    let normalized = value.replace('%', "").replace(',', ".");
    normalized
        .trim()
        .parse::<f64>()
        .map_err(|_| CoerceError::Percentage(value.to_string()))
}

// Day and month may be one or two digits, the year must be exactly four;
// any other separator or year width is rejected before chrono sees it.
static DATE_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap());

/// Parse a dd/mm/yyyy date cell ("05/07/2024" → 2024-07-05)
pub fn parse_date(value: &str) -> Result<NaiveDate, CoerceError> {
    let trimmed = value.trim();
    if !DATE_SHAPE_RE.is_match(trimmed) {
        return Err(CoerceError::Date(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .map_err(|_| CoerceError::Date(value.to_string()))
}

/// Extract the discard reason from a section label cell
///
/// The label cell holds the section name on its first line and
/// "Motivo descarte: <reason>" on its second; the reason is everything after
/// the literal "descarte: ".
pub fn parse_motivo_descartes(cell: &str) -> Result<String, CoerceError> {
    let second_line = cell
        .split('\n')
        .nth(1)
        .ok_or_else(|| CoerceError::MotivoFormat(cell.to_string()))?;
    second_line
        .split_once("descarte: ")
        .map(|(_, reason)| reason.to_string())
        .ok_or_else(|| CoerceError::MotivoFormat(cell.to_string()))
}
