//! Page-level types and the model side-channels attached to each page.

use super::bbox::{rescale, BBox};
use super::block::{Block, Line, SpanId};
use super::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Semantic label predicted by the layout model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionLabel {
    Title,
    #[serde(rename = "Section-header")]
    SectionHeader,
    Formula,
    Figure,
    Picture,
    Text,
    #[serde(rename = "List-item")]
    ListItem,
    Table,
    Caption,
    Footnote,
    #[serde(rename = "Page-header")]
    PageHeader,
    #[serde(rename = "Page-footer")]
    PageFooter,
    #[serde(other)]
    Other,
}

/// A labeled layout region in model image-space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutRegion {
    pub bbox: BBox,
    pub label: RegionLabel,
}

/// Layout model output for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Bounds of the image the model saw
    pub image_bbox: BBox,
    /// Predicted regions
    pub bboxes: Vec<LayoutRegion>,
}

/// A reading-order box in model image-space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBox {
    pub bbox: BBox,
    pub position: usize,
}

/// Reading-order model output for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    pub image_bbox: BBox,
    pub bboxes: Vec<OrderBox>,
}

/// Text-line detector output for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextLines {
    pub image_bbox: BBox,
    pub bboxes: Vec<BBox>,
}

/// A single page in the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    /// Page index (0-based), never changes during fusion
    pub pnum: usize,

    /// Page bounds in page space
    pub bbox: BBox,

    /// Content blocks, reading order pending
    pub blocks: Vec<Block>,

    /// Layout regions, if the layout model ran
    pub layout: Option<Layout>,

    /// Reading-order boxes, if the order model ran
    pub order: Option<Order>,

    /// Detected text lines, if the detector ran
    pub text_lines: Option<TextLines>,

    /// Engine that produced the text when the page was OCR'd
    pub ocr_method: Option<String>,

    /// Region snapshots rendered by the image stage
    #[serde(skip)]
    pub images: Vec<Resource>,
}

impl Page {
    /// Create a new empty page.
    pub fn new(pnum: usize, bbox: BBox) -> Self {
        Self {
            pnum,
            bbox,
            ..Default::default()
        }
    }

    /// Create a US-letter page.
    pub fn letter(pnum: usize) -> Self {
        Self::new(pnum, BBox::new(0.0, 0.0, 612.0, 792.0))
    }

    /// Add a block to the page.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Concatenated text of every line, newline separated.
    pub fn prelim_text(&self) -> String {
        self.lines()
            .map(Line::prelim_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate over every line on the page in block order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }

    /// Number of spans on the page.
    pub fn span_count(&self) -> usize {
        self.lines().map(|l| l.spans.len()).sum()
    }

    /// Layout regions whose label is in `labels`, rescaled into page space.
    pub fn layout_regions(&self, labels: &[RegionLabel]) -> Vec<LayoutRegion> {
        let Some(layout) = &self.layout else {
            return Vec::new();
        };
        layout
            .bboxes
            .iter()
            .filter(|r| labels.contains(&r.label))
            .map(|r| LayoutRegion {
                bbox: rescale(&layout.image_bbox, &self.bbox, &r.bbox),
                label: r.label,
            })
            .collect()
    }

    /// Index of the block with this handle.
    pub fn block_index(&self, id: super::BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Locate a line by handle as `(block index, line index)`.
    pub fn locate_line(&self, id: super::LineId) -> Option<(usize, usize)> {
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(bi, b)| b.line_index(id).map(|li| (bi, li)))
    }

    /// Remove every span whose id is in `ids`. Returns how many were removed.
    pub fn remove_spans(&mut self, ids: &HashSet<SpanId>) -> usize {
        let mut removed = 0;
        for line in self.blocks.iter_mut().flat_map(|b| b.lines.iter_mut()) {
            let before = line.spans.len();
            line.spans.retain(|s| !ids.contains(&s.id));
            removed += before - line.spans.len();
        }
        removed
    }

    /// Drop lines without spans and blocks without lines, then recompute boxes.
    pub fn prune_empty(&mut self) {
        for block in &mut self.blocks {
            block.lines.retain(|l| !l.spans.is_empty());
        }
        self.blocks.retain(|b| !b.is_empty());
        self.recompute_bboxes();
    }

    /// Recompute every line and block box from its children.
    pub fn recompute_bboxes(&mut self) {
        for block in &mut self.blocks {
            block.recompute_bbox();
        }
    }
}
