//! Document-level types.

use super::{Block, Page, Span};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// An extracted document: ordered pages plus a little provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Name used for output files (usually the source file stem)
    pub name: String,

    /// OCR languages requested for this document
    pub languages: Vec<String>,

    /// Pages in the document
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a document from its JSON form.
    ///
    /// Span, line and block handles are freshly allocated and every
    /// bbox is recomputed from its children.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: Document = serde_json::from_str(json)?;
        doc.normalize();
        Ok(doc)
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate over every block of every page.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// Iterate over every span of every page.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.blocks().flat_map(|b| b.spans())
    }

    /// Preliminary text of the whole document.
    pub fn prelim_text(&self) -> String {
        self.pages
            .iter()
            .map(Page::prelim_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of characters of extracted span text.
    pub fn char_count(&self) -> usize {
        self.spans().map(|s| s.text.chars().count()).sum()
    }

    /// Re-establish page numbering and bbox invariants after loading.
    pub fn normalize(&mut self) {
        for (idx, page) in self.pages.iter_mut().enumerate() {
            page.pnum = idx;
            for block in &mut page.blocks {
                block.pnum = idx;
            }
            page.recompute_bboxes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, BlockType, Line};

    #[test]
    fn test_document_new() {
        let doc = Document::new("paper");
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.name, "paper");
    }

    #[test]
    fn test_from_json_normalizes() {
        let json = r#"{
            "name": "sample",
            "pages": [{
                "bbox": {"x0": 0, "y0": 0, "x1": 612, "y1": 792},
                "blocks": [{
                    "block_type": "Text",
                    "bbox": {"x0": 0, "y0": 0, "x1": 1, "y1": 1},
                    "pnum": 7,
                    "lines": [{
                        "bbox": {"x0": 0, "y0": 0, "x1": 1, "y1": 1},
                        "spans": [{"text": "Hello", "bbox": {"x0": 10, "y0": 20, "x1": 60, "y1": 32}}]
                    }]
                }]
            }]
        }"#;
        let doc = Document::from_json(json).unwrap();
        let block = &doc.pages[0].blocks[0];
        assert_eq!(block.pnum, 0);
        assert_eq!(block.bbox, BBox::new(10.0, 20.0, 60.0, 32.0));
        assert_eq!(block.lines[0].bbox, block.bbox);
        assert_eq!(doc.prelim_text(), "Hello");
    }

    #[test]
    fn test_char_count() {
        let mut doc = Document::new("x");
        let mut page = Page::letter(0);
        page.add_block(Block::new(
            BlockType::Text,
            vec![Line::new(vec![Span::new("abc", BBox::new(0.0, 0.0, 1.0, 1.0))])],
            0,
        ));
        doc.add_page(page);
        assert_eq!(doc.char_count(), 3);
    }
}
