//! Error types for the docfuse library.

use std::io;
use thiserror::Error;

/// Result type alias for docfuse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while fusing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON input or unserializable output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is not a document this crate can fuse.
    #[error("Unknown input format: {0}")]
    UnknownFormat(String),

    /// The input document violates a structural expectation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A model collaborator failed or returned a malformed answer.
    #[error("{stage} model error: {message}")]
    Model {
        /// Pipeline stage that invoked the model
        stage: &'static str,
        /// Collaborator-supplied detail
        message: String,
    },

    /// An OCR language code unknown to the selected engine.
    #[error("Invalid language code {code} for {engine}")]
    InvalidLanguage {
        /// The offending code
        code: String,
        /// Engine name
        engine: String,
    },

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Error during rendering (Markdown, text, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a model collaborator failure.
    pub fn model(stage: &'static str, message: impl Into<String>) -> Self {
        Error::Model {
            stage,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::model("layout", "batch size mismatch");
        assert_eq!(err.to_string(), "layout model error: batch size mismatch");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidLanguage {
            code: "xx".into(),
            engine: "tesseract".into(),
        };
        assert_eq!(err.to_string(), "Invalid language code xx for tesseract");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
