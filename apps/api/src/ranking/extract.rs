//! Text extraction adapter: uploaded bytes → plain text, keyed on file extension.
//!
//! - `.txt`: strict UTF-8 (a leading BOM is dropped). Invalid bytes are an encoding failure.
//! - `.pdf`: `pdf-extract`. Malformed PDFs can panic inside the parser; that is caught and
//!   reported as a per-file error.
//! - `.docx`: the `word/document.xml` part of the zip container, one line per paragraph.

use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::DocumentError;

const DOCX_BODY_PART: &str = "word/document.xml";

static DOCX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>")
        .expect("docx token pattern is a valid regex")
});

/// Extracts trimmed plain text from an uploaded file.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" => extract_txt(bytes)?,
        "pdf" => extract_pdf(bytes)?,
        "docx" => extract_docx(bytes)?,
        other => return Err(DocumentError::UnsupportedFormat(format!(".{other}"))),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text.to_string())
}

fn extract_txt(bytes: &[u8]) -> Result<String, DocumentError> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| DocumentError::Encoding)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Pdf(e.to_string())),
        Err(_) => Err(DocumentError::Pdf("parser panicked on malformed input".to_string())),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocumentError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| DocumentError::Docx(format!("{DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|_| DocumentError::Encoding)?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::with_capacity(xml.len() / 4);
    for caps in DOCX_TOKEN.captures_iter(xml) {
        match (caps.get(1), &caps[0]) {
            (Some(run), _) => text.push_str(&unescape_xml(run.as_str())),
            (None, "<w:tab/>") => text.push('\t'),
            (None, _) => text.push('\n'),
        }
    }
    text
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
