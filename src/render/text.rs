//! Plain text rendering for fused documents.

use crate::error::Result;
use crate::model::Document;

use super::{CleanupPipeline, RenderOptions};

/// Convert a document to plain text: every line, blank lines between blocks.
pub fn to_text(doc: &Document, options: &RenderOptions) -> Result<String> {
    let mut output = doc
        .pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .map(|block| block.prelim_text())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if let Some(ref cleanup_options) = options.cleanup {
        let pipeline = CleanupPipeline::new(cleanup_options.clone());
        output = pipeline.process(&output);
    }

    Ok(output.trim().to_string())
}
