//! PDF text extraction module
//!
//! Extracts text content from PDF bytes using lopdf. Line structure is kept
//! so that "Key: Value" exports survive extraction.

use crate::errors::IngestionError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

/// Kerning offsets in a `TJ` array at or below this value read as a word gap
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Plain text and page count of one PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    pub text: String,
    pub page_count: usize,
}

/// Extract text content from PDF bytes; `name` is only used in errors
pub fn extract_pdf(bytes: &[u8], name: &str) -> Result<ExtractedPdf, IngestionError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestionError::PdfParse {
        name: name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut page_texts = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages.iter() {
        match extract_page_text(&doc, *page_id) {
            Ok(page_text) => page_texts.push(page_text),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let text = normalize_lines(&page_texts.join("\n"));
    if text.is_empty() {
        return Err(IngestionError::PdfParse {
            name: name.to_string(),
            message: "No text content extracted from PDF".to_string(),
        });
    }

    debug!(chars = text.chars().count(), "Text extraction complete");

    Ok(ExtractedPdf {
        text,
        page_count: pages.len(),
    })
}

/// Extract text from a single page
fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    let content = doc.get_page_content(page_id)?;
    let content = Content::decode(&content)?;
    Ok(text_from_operations(&content.operations))
}

/// Collect text-showing operators; line-moving operators start a new line
fn text_from_operations(operations: &[Operation]) -> String {
    let mut text = String::new();

    for op in operations {
        match op.operator.as_str() {
            "Tj" => push_operand_text(&mut text, op.operands.first()),
            "'" => {
                text.push('\n');
                push_operand_text(&mut text, op.operands.first());
            }
            "\"" => {
                text.push('\n');
                push_operand_text(&mut text, op.operands.get(2));
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                            other => {
                                if other.as_float().map_or(false, |k| k <= TJ_SPACE_THRESHOLD) {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                }
            }
            "ET" | "T*" | "Td" | "TD" => text.push('\n'),
            _ => {}
        }
    }

    text
}

fn push_operand_text(text: &mut String, operand: Option<&Object>) {
    if let Some(Object::String(bytes, _)) = operand {
        text.push_str(&decode_pdf_string(bytes));
    }
}

/// Decode a PDF string: UTF-16BE when it carries a BOM, otherwise one char per byte
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Collapse whitespace inside each line and drop blank lines
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            line.replace('\u{FEFF}', "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render pages of plain lines into a minimal Helvetica PDF
pub fn render_text_pdf(pages: &[Vec<String>]) -> Result<Vec<u8>, IngestionError> {
    let render_err = |e: lopdf::Error| IngestionError::PdfParse {
        name: "generated".to_string(),
        message: e.to_string(),
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 11.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![50.into(), 790.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(render_err)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| IngestionError::PdfParse {
            name: "generated".to_string(),
            message: e.to_string(),
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_trip_keeps_lines() {
        let pdf = render_text_pdf(&[
            lines(&["Contract Number: 42", "Payment Terms:   Net 30 days"]),
            lines(&["Governing Law: State of New York"]),
        ])
        .unwrap();

        let extracted = assert_ok!(extract_pdf(&pdf, "fixture.pdf"));
        assert_eq!(extracted.page_count, 2);
        assert_eq!(
            extracted.text,
            "Contract Number: 42\nPayment Terms: Net 30 days\nGoverning Law: State of New York"
        );
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = assert_err!(extract_pdf(b"definitely not a pdf", "junk.pdf"));
        assert!(matches!(err, IngestionError::PdfParse { ref name, .. } if name == "junk.pdf"));
    }

    #[test]
    fn test_pdf_without_text_is_rejected() {
        let pdf = render_text_pdf(&[vec![]]).unwrap();
        assert!(matches!(
            extract_pdf(&pdf, "blank.pdf"),
            Err(IngestionError::PdfParse { .. })
        ));
    }

    #[test]
    fn test_tj_array_spacing() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Late"),
                    Object::Integer(-300),
                    Object::string_literal("Pen"),
                    Object::Integer(-20),
                    Object::string_literal("alty"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ];
        assert_eq!(normalize_lines(&text_from_operations(&ops)), "Late Penalty");
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x4E, 0x00, 0x65, 0x00, 0x74];
        assert_eq!(decode_pdf_string(&bytes), "Net");
        assert_eq!(decode_pdf_string(b"caf\xe9"), "café");
    }

    #[test]
    fn test_normalize_lines() {
        assert_eq!(normalize_lines("  a   b \n\n\t c  \n"), "a b\nc");
    }
}
