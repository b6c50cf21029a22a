//! # docfuse
//!
//! Layout fusion and document reconstruction for Rust.
//!
//! This library takes a span-level extraction of a document (text with
//! geometry and font metadata) together with model predictions (layout
//! regions, reading order, detected text lines, OCR and equation text) and
//! fuses them into one structured document rendered as Markdown.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docfuse::{convert_document, Document, FusionOptions, ModelSet};
//!
//! fn main() -> docfuse::Result<()> {
//!     let json = std::fs::read_to_string("paper.json")?;
//!     let doc = Document::from_json(&json)?;
//!
//!     let result = convert_document(doc, &ModelSet::new(), &FusionOptions::default())?;
//!     println!("{}", result.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Detection**: fill missing layout, order and text-line channels from models
//! - **OCR**: re-recognize pages whose extracted text is missing or garbled
//! - **Cleaning**: font styles, code blocks, running headers and repeated titles
//! - **Splicing**: headings, equations and figures cut in at their regions
//! - **Reading order**: blocks sorted by the order model's positions
//! - **Benchmark**: windowed fuzzy alignment against reference Markdown

pub mod benchmark;
pub mod cleaners;
pub mod convert;
pub mod debug;
pub mod detect;
pub mod equations;
pub mod error;
pub mod images;
pub mod layout;
pub mod model;
pub mod models;
pub mod ocr;
pub mod options;
pub mod render;
pub mod similarity;

// Re-export commonly used types
pub use benchmark::{score_text, BenchmarkReport, FileScore};
pub use convert::{convert_document, load_document, ConvertResult, DocFuse, FusionStats};
pub use detect::{detect_kind_from_bytes, detect_kind_from_path, InputKind};
pub use error::{Error, Result};
pub use model::{
    BBox, Block, BlockType, Document, Layout, LayoutRegion, Line, Order, OrderBox, Page,
    RegionLabel, Resource, Span, TextLines,
};
pub use models::{
    EquationModel, LayoutModel, ModelSet, OcrEngine, OrderModel, PageRenderer, TextLineDetector,
};
pub use options::{Device, FusionOptions, OcrEngineKind};
pub use render::{CleanupOptions, CleanupPreset, JsonFormat, RenderOptions};

use std::path::Path;

/// Fuse a document JSON file into Markdown without any models.
///
/// Predictions embedded in the file still drive every stage.
///
/// # Example
///
/// ```no_run
/// let markdown = docfuse::to_markdown("paper.json")?;
/// std::fs::write("paper.md", markdown)?;
/// # Ok::<(), docfuse::Error>(())
/// ```
pub fn to_markdown<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(DocFuse::new().convert_file(path)?.markdown)
}

/// Fuse a document JSON file and render it as plain text.
pub fn to_text<P: AsRef<Path>>(path: P, options: &RenderOptions) -> Result<String> {
    let result = DocFuse::new().convert_file(path)?;
    render::to_text(&result.document, options)
}

/// Fuse a document JSON file and serialize the fused document.
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let result = DocFuse::new().convert_file(path)?;
    render::to_json(&result.document, format)
}
