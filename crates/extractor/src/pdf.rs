//! PDF text extraction module
//!
//! Extracts text content from gazette PDFs using lopdf. Line structure is
//! kept so that headings and numbered items survive into the parser.

use crate::errors::ExtractionError;
use lopdf::content::{Content, Operation};
use lopdf::Object;
use std::path::Path;
use tracing::{debug, warn};

/// TJ kerning (thousandths of an em) wide enough to read as a word gap
const WORD_GAP: f64 = -200.0;

/// Extract text content from a PDF file
pub fn extract_text_from_pdf(path: &Path) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load(path).map_err(|e| ExtractionError::PdfParse {
        path: path.display().to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for (page_num, page_id) in pages {
        match extract_page_text(&doc, page_id) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::PdfParse {
            path: path.display().to_string(),
            message: "No text content extracted from PDF".to_string(),
        });
    }

    debug!(chars = text.len(), "Text extraction complete");
    Ok(text)
}

/// Extract text from a single page
fn extract_page_text(doc: &lopdf::Document, page_id: lopdf::ObjectId) -> Result<String, lopdf::Error> {
    let content = doc.get_page_content(page_id)?;
    let content = Content::decode(&content)?;
    Ok(text_from_operations(&content.operations))
}

/// Walk a content stream, emitting shown text and a newline per line move
fn text_from_operations(operations: &[Operation]) -> String {
    let mut text = String::new();
    let mut in_text_block = false;

    for op in operations {
        match op.operator.as_str() {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                end_line(&mut text);
            }
            _ if !in_text_block => {}
            "Tj" => {
                if let Some(s) = op.operands.first() {
                    push_string(&mut text, s);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match number(item) {
                            Some(n) if n < WORD_GAP => {
                                if !text.ends_with([' ', '\n']) {
                                    text.push(' ');
                                }
                            }
                            Some(_) => {}
                            None => push_string(&mut text, item),
                        }
                    }
                }
            }
            "'" | "\"" => {
                end_line(&mut text);
                if let Some(s) = op.operands.last() {
                    push_string(&mut text, s);
                }
            }
            "T*" => end_line(&mut text),
            "Td" | "TD" => {
                let moves_down = op.operands.get(1).and_then(number).map(|ty| ty != 0.0);
                if moves_down.unwrap_or(false) {
                    end_line(&mut text);
                } else if !text.is_empty() && !text.ends_with([' ', '\n']) {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }

    text
}

fn end_line(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn push_string(text: &mut String, obj: &Object) {
    if let Object::String(bytes, _) = obj {
        text.push_str(&decode_pdf_bytes(bytes));
    }
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, Latin-1 otherwise
fn decode_pdf_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;
    use std::io::Write;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    #[test]
    fn test_operations_keep_lines() {
        let ops = vec![
            op("BT", vec![]),
            op("Tj", vec![Object::string_literal("CHANGE OF NAMES")]),
            op("Td", vec![Object::Integer(0), Object::Integer(-14)]),
            op("TJ", vec![Object::Array(vec![
                Object::string_literal("1024."),
                Object::Integer(-250),
                Object::string_literal("Mr. Kwame"),
                Object::Integer(-30),
                Object::string_literal(" Mensah"),
            ])]),
            op("ET", vec![]),
            op("Tj", vec![Object::string_literal("outside text block")]),
        ];

        assert_eq!(
            text_from_operations(&ops),
            "CHANGE OF NAMES\n1024. Mr. Kwame Mensah\n"
        );
    }

    #[test]
    fn test_quote_operator_starts_new_line() {
        let ops = vec![
            op("BT", vec![]),
            op("Tj", vec![Object::string_literal("first")]),
            op("'", vec![Object::string_literal("second")]),
            op("ET", vec![]),
        ];
        assert_eq!(text_from_operations(&ops), "first\nsecond\n");
    }

    #[test]
    fn test_decode_pdf_bytes() {
        assert_eq!(decode_pdf_bytes(b"Accra"), "Accra");
        assert_eq!(decode_pdf_bytes(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x6B]), "Ak");
        assert_eq!(decode_pdf_bytes(&[0xE9]), "é");

        let hex = Object::String(vec![0x4B, 0x6F, 0x66, 0x69], StringFormat::Hexadecimal);
        let mut text = String::new();
        push_string(&mut text, &hex);
        assert_eq!(text, "Kofi");
    }

    #[test]
    fn test_invalid_pdf_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pdf").unwrap();

        let err = extract_text_from_pdf(file.path()).unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParse { .. }));
    }
}
