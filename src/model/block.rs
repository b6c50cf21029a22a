//! Blocks, lines and spans: the nested tree every fusion stage rewrites.

use super::bbox::{union_bbox, BBox, HasBBox};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a fresh, process-unique handle.
            pub fn next() -> Self {
                Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::next()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle!(
    /// Stable identity of a span, used for targeted deletion.
    SpanId
);
handle!(
    /// Stable identity of a line, used to anchor insertion points.
    LineId
);
handle!(
    /// Stable identity of a block.
    BlockId
);

/// Structural role of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockType {
    /// Running text
    #[default]
    Text,
    /// Literal source code
    Code,
    /// Document title
    Title,
    /// Section heading
    #[serde(rename = "Section-header")]
    SectionHeader,
    /// Display equation
    Formula,
    /// Figure or picture
    #[serde(alias = "Picture")]
    Figure,
}

impl BlockType {
    /// Title or section heading.
    pub fn is_heading(&self) -> bool {
        matches!(self, BlockType::Title | BlockType::SectionHeader)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockType::Text => "Text",
            BlockType::Code => "Code",
            BlockType::Title => "Title",
            BlockType::SectionHeader => "Section-header",
            BlockType::Formula => "Formula",
            BlockType::Figure => "Figure",
        };
        f.write_str(name)
    }
}

/// The smallest styled run of text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    /// Identifier, fresh on every load
    #[serde(skip_deserializing)]
    pub id: SpanId,

    /// Text content
    pub text: String,

    /// Position on the page
    pub bbox: BBox,

    /// Font name as reported by the extractor
    pub font: String,

    /// Font weight (400 regular, 700 bold)
    pub font_weight: f32,

    /// Font size in points
    pub font_size: f32,

    /// Bold flag
    pub bold: bool,

    /// Italic flag
    pub italic: bool,

    /// Whether this span references a rendered image
    pub image: bool,
}

impl Span {
    /// Create a plain span.
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            ..Default::default()
        }
    }

    /// Set font name and size.
    pub fn with_font(mut self, font: impl Into<String>, size: f32) -> Self {
        self.font = font.into();
        self.font_size = size;
        self
    }

    /// Set font weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.font_weight = weight;
        self
    }
}

impl HasBBox for Span {
    fn bbox(&self) -> BBox {
        self.bbox
    }
}

/// A visual line of spans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    #[serde(skip_deserializing)]
    pub id: LineId,

    /// Union of the span boxes
    pub bbox: BBox,

    /// Spans in left-to-right order
    pub spans: Vec<Span>,
}

impl Line {
    /// Create a line whose bbox is the union of its spans.
    pub fn new(spans: Vec<Span>) -> Self {
        let bbox = union_bbox(&spans).unwrap_or_default();
        Self {
            id: LineId::next(),
            bbox,
            spans,
        }
    }

    /// Concatenated span text.
    pub fn prelim_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// True when the line carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    /// Recompute the bbox from the spans. Lines without spans keep their box.
    pub fn recompute_bbox(&mut self) {
        if let Some(bbox) = union_bbox(&self.spans) {
            self.bbox = bbox;
        }
    }

    /// Fraction of this line covered by `region`.
    pub fn intersection_pct(&self, region: &BBox) -> f32 {
        self.bbox.intersection_pct(region)
    }
}

impl HasBBox for Line {
    fn bbox(&self) -> BBox {
        self.bbox
    }
}

/// A structural unit of a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    #[serde(skip_deserializing)]
    pub id: BlockId,

    /// Structural role
    pub block_type: BlockType,

    /// Union of the line boxes
    pub bbox: BBox,

    /// Lines in reading order
    pub lines: Vec<Line>,

    /// Owning page index (0-based)
    pub pnum: usize,
}

impl Block {
    /// Create a block whose bbox is the union of its lines.
    pub fn new(block_type: BlockType, lines: Vec<Line>, pnum: usize) -> Self {
        let bbox = union_bbox(&lines).unwrap_or_default();
        Self {
            id: BlockId::next(),
            block_type,
            bbox,
            lines,
            pnum,
        }
    }

    /// Block text, lines joined with newlines.
    pub fn prelim_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::prelim_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Recompute line boxes, then the block box. Empty blocks keep their box.
    pub fn recompute_bbox(&mut self) {
        for line in &mut self.lines {
            line.recompute_bbox();
        }
        if let Some(bbox) = union_bbox(&self.lines) {
            self.bbox = bbox;
        }
    }

    /// Leftmost line start within the block.
    pub fn min_line_start(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| l.bbox.x0)
            .fold(f32::INFINITY, f32::min)
    }

    /// Iterate over every span in the block.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }

    /// Position of the line with this handle.
    pub fn line_index(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|l| l.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl HasBBox for Block {
    fn bbox(&self) -> BBox {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> Span {
        Span::new(text, BBox::new(x0, y0, x1, y1))
    }

    #[test]
    fn test_handles_are_unique() {
        let a = SpanId::next();
        let b = SpanId::next();
        assert_ne!(a, b);
        assert_ne!(Span::default().id, Span::default().id);
    }

    #[test]
    fn test_line_bbox_is_union_of_spans() {
        let line = Line::new(vec![
            span("Hello ", 10.0, 10.0, 40.0, 20.0),
            span("world", 40.0, 9.0, 70.0, 21.0),
        ]);
        assert_eq!(line.bbox, BBox::new(10.0, 9.0, 70.0, 21.0));
        assert_eq!(line.prelim_text(), "Hello world");
    }

    #[test]
    fn test_block_recompute_after_edit() {
        let mut block = Block::new(
            BlockType::Text,
            vec![
                Line::new(vec![span("a", 0.0, 0.0, 10.0, 10.0)]),
                Line::new(vec![span("b", 0.0, 10.0, 50.0, 20.0)]),
            ],
            0,
        );
        assert_eq!(block.bbox, BBox::new(0.0, 0.0, 50.0, 20.0));
        block.lines.remove(1);
        block.recompute_bbox();
        assert_eq!(block.bbox, BBox::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_block_type_serde_names() {
        let json = serde_json::to_string(&BlockType::SectionHeader).unwrap();
        assert_eq!(json, "\"Section-header\"");
        let parsed: BlockType = serde_json::from_str("\"Picture\"").unwrap();
        assert_eq!(parsed, BlockType::Figure);
    }

    #[test]
    fn test_deserialized_ids_are_fresh() {
        let json = r#"{"text": "x", "id": 1}"#;
        let a: Span = serde_json::from_str(json).unwrap();
        let b: Span = serde_json::from_str(json).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_blank_line() {
        let line = Line::new(vec![span("   ", 0.0, 0.0, 5.0, 5.0)]);
        assert!(line.is_blank());
    }
}
