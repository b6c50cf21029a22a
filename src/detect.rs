//! Input kind detection.
//!
//! Only extracted-document JSON can be fused directly. PDFs are recognized
//! by their magic bytes so callers can point users at an extractor.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// What an input file contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// A serialized [`Document`](crate::model::Document)
    DocumentJson,
    /// A PDF file with its header version (e.g., "1.7")
    Pdf { version: String },
    /// Anything else
    Other,
}

impl InputKind {
    /// Whether the fusion pipeline can take this input as-is.
    pub fn is_convertible(&self) -> bool {
        matches!(self, InputKind::DocumentJson)
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::DocumentJson => write!(f, "document JSON"),
            InputKind::Pdf { version } => write!(f, "PDF {}", version),
            InputKind::Other => write!(f, "other"),
        }
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Detect the kind of a file.
pub fn detect_kind_from_path<P: AsRef<Path>>(path: P) -> Result<InputKind> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(detect_kind_from_bytes(&data))
}

/// Detect the kind of in-memory content.
pub fn detect_kind_from_bytes(data: &[u8]) -> InputKind {
    if let Ok(version) = pdf_version(data) {
        return InputKind::Pdf { version };
    }
    if is_document_json(data) {
        return InputKind::DocumentJson;
    }
    InputKind::Other
}

/// Read the version from a PDF header.
pub fn pdf_version(data: &[u8]) -> Result<String> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN || !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat("missing PDF header".into()));
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();
    if !is_valid_version(&version) {
        return Err(Error::UnknownFormat(format!("bad PDF version {}", version)));
    }
    Ok(version)
}

fn is_valid_version(version: &str) -> bool {
    let chars: Vec<char> = version.chars().collect();
    chars.len() == 3 && chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// A JSON object carrying a `pages` array.
fn is_document_json(data: &[u8]) -> bool {
    let starts_with_brace = data
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    if !starts_with_brace {
        return false;
    }
    serde_json::from_slice::<serde_json::Value>(data)
        .map(|value| value.get("pages").is_some_and(|p| p.is_array()))
        .unwrap_or(false)
}

/// Check if a file is fusable document JSON.
pub fn is_document_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_kind_from_path(path), Ok(InputKind::DocumentJson))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdf() {
        let kind = detect_kind_from_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3");
        assert_eq!(kind, InputKind::Pdf { version: "1.7".into() });
        assert!(!kind.is_convertible());
    }

    #[test]
    fn test_detect_document_json() {
        let kind = detect_kind_from_bytes(br#"  {"name": "a", "pages": []}"#);
        assert_eq!(kind, InputKind::DocumentJson);
        assert!(kind.is_convertible());
    }

    #[test]
    fn test_detect_other() {
        assert_eq!(detect_kind_from_bytes(b""), InputKind::Other);
        assert_eq!(detect_kind_from_bytes(b"%PDF-"), InputKind::Other);
        assert_eq!(detect_kind_from_bytes(b"%PDF-x.y"), InputKind::Other);
        assert_eq!(detect_kind_from_bytes(br#"{"name": "no pages"}"#), InputKind::Other);
        assert_eq!(detect_kind_from_bytes(b"<!DOCTYPE html>"), InputKind::Other);
    }

    #[test]
    fn test_pdf_version_error() {
        assert!(matches!(pdf_version(b"nope"), Err(Error::UnknownFormat(_))));
    }

    #[test]
    fn test_detect_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"pages": [{"pnum": 0}]}"#).unwrap();
        assert!(is_document_file(&path));
        assert!(!is_document_file(dir.path().join("missing.json")));
    }
}
