//! Text extraction for uploaded study materials.
//!
//! Dispatch is by file extension (the upload routes have already validated
//! it). Binary formats are parsed in-memory: PDF via `pdf-extract`, DOCX by
//! walking `w:t` runs inside the OOXML archive. Image uploads are accepted by
//! validation but carry no text this layer can recover, so they extract to
//! an error the handler reports.

use std::io::Read;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. Handlers convert this into the route's 500 response;
/// malformed input never panics.
#[derive(Debug)]
pub enum ExtractError {
    /// Extension is accepted for upload but has no text extraction path.
    Unsupported(String),
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Unsupported(ext) => {
                write!(f, "no text extraction available for .{} files", ext)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from uploaded bytes based on the file extension
/// (lowercase, without the dot).
pub fn extract_text(bytes: &[u8], ext: &str) -> Result<String, ExtractError> {
    match ext {
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        "doc" => Ok(salvage_legacy_doc(bytes)),
        "jpg" | "jpeg" | "png" => Err(ExtractError::Unsupported(ext.to_string())),
        other => Err(ExtractError::Unsupported(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Legacy `.doc` is a binary container; without a full OLE parser the best
/// this layer can do is salvage printable runs from a lossy decode.
fn salvage_legacy_doc(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut out = String::new();
    for c in text.chars() {
        if c == '\n' || c == '\t' || (!c.is_control() && c != '\u{fffd}') {
            out.push(c);
        }
    }
    out
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Ooxml("word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_w_t_elements(&doc_xml)
}

/// Walks the document XML collecting the text of every `w:t` run.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn txt_passes_through() {
        let text = extract_text("plain notes\nsecond line".as_bytes(), "txt").unwrap();
        assert_eq!(text, "plain notes\nsecond line");
    }

    #[test]
    fn image_extensions_are_unsupported() {
        let err = extract_text(b"\x89PNG", "png").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", "docx").unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn docx_without_document_xml_returns_error() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut cursor);
            w.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            w.write_all(b"<x/>").unwrap();
            w.finish().unwrap();
        }
        let err = extract_text(cursor.get_ref(), "docx").unwrap_err();
        assert!(err.to_string().contains("document.xml"));
    }

    #[test]
    fn docx_text_runs_are_extracted() {
        let xml = br#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>World</w:t></w:r></w:p></w:body>
            </w:document>"#;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut cursor);
            w.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            w.write_all(xml).unwrap();
            w.finish().unwrap();
        }
        let text = extract_text(cursor.get_ref(), "docx").unwrap();
        assert_eq!(text, "Hello World");
    }

    #[test]
    fn doc_salvage_strips_control_bytes() {
        let text = extract_text(b"\x00\x01Biology\x02 notes\n", "doc").unwrap();
        assert_eq!(text, "Biology notes\n");
    }
}
