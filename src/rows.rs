//! Row extraction from report PDFs using lopdf
//!
//! Turns a document into the flat cell matrix the parser consumes: positioned
//! text collected from content streams, clustered into rows by Y and into
//! cells by X gaps, empty cells removed, tables concatenated in page order.
//! Embedded images are extracted alongside and passed through untouched.
//!
//! This targets the fixed-layout report family only; there is no generic
//! layout analysis, OCR, or font CMap decoding here.

use crate::ReportError;
use lopdf::{Document, Object, ObjectId};
use std::path::Path;

/// An embedded image, as stored in the PDF (bytes are the raw stream data,
/// e.g. JPEG for DCTDecode images)
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub width: i64,
    pub height: i64,
    pub data: Vec<u8>,
}

/// Raw extraction result: cell matrix plus embedded images, both in document
/// order
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub matrix: Vec<Vec<String>>,
    pub images: Vec<ImageBlob>,
}

/// A piece of text with its page position
#[derive(Debug, Clone)]
struct PositionedText {
    text: String,
    x: f32,
    y: f32,
    font_size: f32,
}

/// Items within this Y distance belong to the same row
const ROW_Y_TOLERANCE: f32 = 4.0;

/// A horizontal gap wider than this starts a new cell
const CELL_X_GAP: f32 = 12.0;

/// A single-cell line this close below a multi-cell row is a wrapped
/// continuation of that row's first (label) cell
const CONTINUATION_MAX_GAP: f32 = 14.0;

/// X tolerance for a continuation line to count as first-column aligned
const CONTINUATION_X_TOLERANCE: f32 = 20.0;

/// Extract rows and images from a PDF file
pub fn extract_rows<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument, ReportError> {
    let doc = Document::load(path)?;
    extract_from_doc(&doc)
}

/// Extract rows and images from a PDF memory buffer
pub fn extract_rows_mem(buffer: &[u8]) -> Result<ExtractedDocument, ReportError> {
    let doc = Document::load_mem(buffer)?;
    extract_from_doc(&doc)
}

fn extract_from_doc(doc: &Document) -> Result<ExtractedDocument, ReportError> {
    let mut matrix = Vec::new();
    let mut images = Vec::new();

    // get_pages is keyed by page number, so iteration is document order
    for (page_num, &page_id) in doc.get_pages().iter() {
        let items = page_text_items(doc, page_id)?;
        let rows = items_to_rows(items);
        log::debug!("page {}: {} rows", page_num, rows.len());
        matrix.extend(rows);
        images.extend(page_images(doc, page_id));
    }

    Ok(ExtractedDocument { matrix, images })
}

/// Multiply two 2D transformation matrices ([a, b, c, d, e, f] form)
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Collect positioned text from one page's content stream
///
/// Tracks the graphics and text state operators that move text around
/// (q/Q/cm, BT/ET, Tf, Td/TD, Tm, T*) and records every Tj/TJ string with
/// its device-space position.
fn page_text_items(doc: &Document, page_id: ObjectId) -> Result<Vec<PositionedText>, ReportError> {
    use lopdf::content::Content;

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| ReportError::Pdf(e.to_string()))?;

    let mut items = Vec::new();

    let mut ctm = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();
    let mut text_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut font_size: f32 = 12.0;
    let mut in_text_block = false;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    ctm = multiply_matrices(&m, &ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Some(size) = get_number(&op.operands[1]) {
                        font_size = size;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    line_matrix[4] += get_number(&op.operands[0]).unwrap_or(0.0);
                    line_matrix[5] += get_number(&op.operands[1]).unwrap_or(0.0);
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = text_matrix;
                }
            }
            "T*" => {
                line_matrix[5] -= font_size * 1.2;
                text_matrix = line_matrix;
            }
            "Tj" | "TJ" => {
                if !in_text_block || op.operands.is_empty() {
                    continue;
                }
                let text = if op.operator == "Tj" {
                    operand_text(&op.operands[0]).unwrap_or_default()
                } else {
                    // TJ: array of strings and kerning adjustments; strings only
                    match op.operands[0].as_array() {
                        Ok(array) => array.iter().filter_map(operand_text).collect(),
                        Err(_) => String::new(),
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }
                let combined = multiply_matrices(&text_matrix, &ctm);
                let rendered_size = (font_size * text_matrix[3]).abs();
                items.push(PositionedText {
                    text,
                    x: combined[4],
                    y: combined[5],
                    font_size: if rendered_size > 0.0 {
                        rendered_size
                    } else {
                        font_size
                    },
                });
            }
            _ => {}
        }
    }

    Ok(items)
}

fn operand_text(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_text_bytes(bytes)),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE when BOM-prefixed, Latin-1 otherwise
///
/// Report documents use simple WinAnsi-style fonts; the Latin-1 fallback
/// covers the Spanish accented characters ("RECEPCIÓN", "Nº").
fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// A clustered line: row Y plus (x, text) cells in left-to-right order
#[derive(Debug)]
struct Line {
    y: f32,
    cells: Vec<(f32, String)>,
}

/// Cluster positioned text into clean rows of non-empty cells
fn items_to_rows(mut items: Vec<PositionedText>) -> Vec<Vec<String>> {
    if items.is_empty() {
        return Vec::new();
    }

    // top to bottom
    items.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal));

    let mut grouped: Vec<(f32, Vec<PositionedText>)> = Vec::new();
    for item in items {
        match grouped.last_mut() {
            Some((y, members)) if (*y - item.y).abs() <= ROW_Y_TOLERANCE => members.push(item),
            _ => grouped.push((item.y, vec![item])),
        }
    }

    // left to right within each line, then fold into cells
    let mut lines: Vec<Line> = grouped
        .into_iter()
        .map(|(y, mut members)| {
            members.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            let mut cells = Vec::new();
            for item in members {
                push_into_cells(&mut cells, item);
            }
            Line { y, cells }
        })
        .collect();

    merge_continuation_lines(&mut lines);

    lines
        .into_iter()
        .filter_map(|line| {
            let row: Vec<String> = line
                .cells
                .into_iter()
                .map(|(_, text)| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            (!row.is_empty()).then_some(row)
        })
        .collect()
}

/// Append an item to the current line, starting a new cell when the
/// horizontal gap from the previous item is wide enough
fn push_into_cells(cells: &mut Vec<(f32, String)>, item: PositionedText) {
    // item widths are not tracked; estimate from text length and font size
    let estimated_end = |x: f32, text: &str, size: f32| x + text.chars().count() as f32 * size * 0.5;

    if let Some((cell_x, cell_text)) = cells.last_mut() {
        let prev_end = estimated_end(*cell_x, cell_text, item.font_size);
        if item.x - prev_end <= CELL_X_GAP {
            cell_text.push(' ');
            cell_text.push_str(&item.text);
            return;
        }
    }
    cells.push((item.x, item.text));
}

/// Fold wrapped label lines back into the cell they belong to
///
/// Section label cells span two visual lines ("CHAPADUR HARDBOARD" /
/// "Motivo descarte: ..."); the second line arrives as its own single-cell
/// line just below, x-aligned with column 0. The parser needs the embedded
/// newline to split the reason text out.
fn merge_continuation_lines(lines: &mut Vec<Line>) {
    let mut i = 1;
    while i < lines.len() {
        let is_continuation = {
            let prev = &lines[i - 1];
            let curr = &lines[i];
            curr.cells.len() == 1
                && prev.cells.len() >= 2
                && prev.y - curr.y <= CONTINUATION_MAX_GAP
                && (curr.cells[0].0 - prev.cells[0].0).abs() <= CONTINUATION_X_TOLERANCE
        };
        if is_continuation {
            let mut removed = lines.remove(i);
            if let Some((_, text)) = removed.cells.pop() {
                let label = &mut lines[i - 1].cells[0].1;
                label.push('\n');
                label.push_str(&text);
            }
        } else {
            i += 1;
        }
    }
}

/// Collect embedded images from one page's XObject resources
///
/// Best effort: a page without resources or with malformed XObjects simply
/// contributes no images.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<ImageBlob> {
    let mut images = Vec::new();

    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return images;
    };
    let resources = match page_dict.get(b"Resources") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(resources) = resources else {
        return images;
    };
    let xobject_dict = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(xobject_dict) = xobject_dict else {
        return images;
    };

    for (_, value) in xobject_dict.iter() {
        let Ok(xobj_ref) = value.as_reference() else {
            continue;
        };
        let Ok(xobj) = doc.get_object(xobj_ref) else {
            continue;
        };
        let Ok(stream) = xobj.as_stream() else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let width = stream
            .dict
            .get(b"Width")
            .ok()
            .and_then(|w| w.as_i64().ok())
            .unwrap_or(0);
        let height = stream
            .dict
            .get(b"Height")
            .ok()
            .and_then(|h| h.as_i64().ok())
            .unwrap_or(0);
        images.push(ImageBlob {
            width,
            height,
            data: stream.content.clone(),
        });
    }

    images
}
