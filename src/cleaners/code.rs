//! Code block detection and monospace reflow.

use crate::model::{Block, BlockType, Document, Line, Span};
use crate::options::FusionOptions;
use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(//|#|'|--|/\*|'''|"""|--\[\[|<!--|%|%\{|\(\*)"#)
        .expect("Invalid comment prefix regex")
});

/// Document-wide font statistics used by the code classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontStatistics {
    /// Mean span font size
    pub mean_font_size: f32,
    /// Median line height
    pub median_line_height: f32,
}

impl FontStatistics {
    /// Collect statistics over every span and line, `None` when the document has no spans.
    pub fn collect(doc: &Document) -> Option<Self> {
        let sizes: Vec<f32> = doc.spans().map(|s| s.font_size).collect();
        if sizes.is_empty() {
            return None;
        }
        let mut heights: Vec<f32> = doc
            .blocks()
            .flat_map(|b| b.lines.iter())
            .map(|l| l.bbox.height())
            .collect();
        Some(Self {
            mean_font_size: mean(&sizes),
            median_line_height: median(&mut heights),
        })
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Word characters per line break, below `limit` for short code-like lines.
fn is_code_line_density(lines: &[Line], limit: f32) -> bool {
    let word_chars: usize = lines
        .iter()
        .map(|l| {
            l.prelim_text()
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .count()
        })
        .sum();
    if word_chars == 0 {
        return false;
    }
    let breaks = lines.len().saturating_sub(1).max(1);
    (word_chars as f32 / breaks as f32) < limit
}

fn comment_count(lines: &[Line]) -> usize {
    lines
        .iter()
        .filter(|l| COMMENT_PREFIX.is_match(&l.prelim_text()))
        .count()
}

fn is_code_block(block: &Block, stats: Option<&FontStatistics>, options: &FusionOptions) -> bool {
    let line_count = block.lines.len();
    if line_count <= 3 {
        return false;
    }
    if !is_code_line_density(&block.lines, options.code_density_limit) {
        return false;
    }

    let min_start = block.min_line_start();
    let indented = block.lines.iter().filter(|l| l.bbox.x0 > min_start).count();
    let structured = (indented + comment_count(&block.lines)) as f32;
    if structured <= line_count as f32 * options.code_indent_ratio {
        return false;
    }

    // Font checks only when the document has usable statistics.
    if let Some(stats) = stats.filter(|s| s.mean_font_size != 0.0) {
        let sizes: Vec<f32> = block.spans().map(|s| s.font_size).collect();
        let heights: Vec<f32> = block.lines.iter().map(|l| l.bbox.height()).collect();
        if mean(&sizes) > stats.mean_font_size * options.code_font_ratio {
            return false;
        }
        if mean(&heights) >= stats.median_line_height * options.code_font_ratio {
            return false;
        }
    }
    true
}

/// Reclassify text blocks that look like source code. Returns the number reclassified.
pub fn identify_code_blocks(doc: &mut Document, options: &FusionOptions) -> usize {
    let stats = FontStatistics::collect(doc);
    if stats.is_none() {
        log::debug!("No spans found, code detection runs without font statistics");
    }

    let mut count = 0;
    for block in doc.pages.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
        if block.block_type != BlockType::Text || block.lines.is_empty() {
            continue;
        }
        if is_code_block(block, stats.as_ref(), options) {
            block.block_type = BlockType::Code;
            count += 1;
        }
    }
    count
}

/// Rebuild the text of one code block, restoring indentation from geometry.
pub fn reflow_code_text(block: &Block) -> String {
    let min_left = block.min_line_start();
    let col_width = block
        .spans()
        .find(|s| !s.text.is_empty())
        .map(|s| s.bbox.width() / s.text.chars().count() as f32)
        .filter(|w| *w > 0.0);

    let mut rows = Vec::with_capacity(block.lines.len());
    let mut previous_blank = false;
    for line in &block.lines {
        let text = line.prelim_text();
        let blank = text.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        let indent = match col_width {
            Some(width) => ((line.bbox.x0 - min_left) / width).round().max(0.0) as usize,
            None => 0,
        };
        rows.push(format!("{}{}", " ".repeat(indent), text));
        previous_blank = blank;
    }
    rows.join("\n")
}

/// Collapse every code block into a single line holding one reflowed span.
pub fn indent_blocks(doc: &mut Document) -> usize {
    let mut count = 0;
    for block in doc.pages.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
        if block.block_type != BlockType::Code || block.lines.is_empty() {
            continue;
        }
        let text = reflow_code_text(block);
        let template = block.spans().next().cloned().unwrap_or_default();
        let span = Span {
            text,
            bbox: block.bbox,
            font: template.font,
            font_weight: template.font_weight,
            font_size: template.font_size,
            ..Default::default()
        };
        block.lines = vec![Line::new(vec![span])];
        block.recompute_bbox();
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Page};

    fn line_at(text: &str, x0: f32, y0: f32, size: f32, height: f32) -> Line {
        let width = text.chars().count().max(1) as f32 * 6.0;
        Line::new(vec![Span::new(text, BBox::new(x0, y0, x0 + width, y0 + height))
            .with_font("Courier", size)])
    }

    fn code_block() -> Block {
        Block::new(
            BlockType::Text,
            vec![
                line_at("fn main() {", 50.0, 100.0, 8.0, 8.0),
                line_at("let x = 1;", 74.0, 110.0, 8.0, 8.0),
                line_at("// add one", 74.0, 120.0, 8.0, 8.0),
                line_at("println!(x);", 74.0, 130.0, 8.0, 8.0),
                line_at("}", 50.0, 140.0, 8.0, 8.0),
            ],
            0,
        )
    }

    fn prose_block(y: f32) -> Block {
        Block::new(
            BlockType::Text,
            (0..4)
                .map(|i| {
                    line_at(
                        "The quick brown fox jumps over the lazy dog again and again.",
                        50.0,
                        y + i as f32 * 16.0,
                        12.0,
                        14.0,
                    )
                })
                .collect(),
            0,
        )
    }

    fn doc_with(blocks: Vec<Block>) -> Document {
        let mut doc = Document::new("code");
        let mut page = Page::letter(0);
        for b in blocks {
            page.add_block(b);
        }
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_identify_code_block() {
        let mut doc = doc_with(vec![prose_block(200.0), prose_block(300.0), code_block()]);
        let options = FusionOptions::default();
        assert_eq!(identify_code_blocks(&mut doc, &options), 1);
        assert_eq!(doc.pages[0].blocks[2].block_type, BlockType::Code);
        assert_eq!(doc.pages[0].blocks[0].block_type, BlockType::Text);
    }

    #[test]
    fn test_identify_is_idempotent() {
        let mut doc = doc_with(vec![prose_block(200.0), prose_block(300.0), code_block()]);
        let options = FusionOptions::default();
        identify_code_blocks(&mut doc, &options);
        assert_eq!(identify_code_blocks(&mut doc, &options), 0);
    }

    #[test]
    fn test_short_blocks_are_not_code() {
        let mut block = code_block();
        block.lines.truncate(3);
        let mut doc = doc_with(vec![block]);
        assert_eq!(identify_code_blocks(&mut doc, &FusionOptions::default()), 0);
    }

    #[test]
    fn test_density_without_word_chars() {
        let lines = vec![line_at("{}", 0.0, 0.0, 8.0, 8.0), line_at(";;", 0.0, 10.0, 8.0, 8.0)];
        assert!(!is_code_line_density(&lines, 80.0));
    }

    #[test]
    fn test_comment_markers() {
        let lines: Vec<Line> = ["# note", "<!-- x -->", "(* ml *)", "plain", "%{ matlab"]
            .iter()
            .map(|t| line_at(t, 0.0, 0.0, 8.0, 8.0))
            .collect();
        assert_eq!(comment_count(&lines), 4);
    }

    #[test]
    fn test_reflow_restores_indent() {
        let mut doc = doc_with(vec![code_block()]);
        doc.pages[0].blocks[0].block_type = BlockType::Code;
        assert_eq!(indent_blocks(&mut doc), 1);

        let block = &doc.pages[0].blocks[0];
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.lines[0].spans.len(), 1);
        assert_eq!(
            block.lines[0].spans[0].text,
            "fn main() {\n    let x = 1;\n    // add one\n    println!(x);\n}"
        );
        assert_eq!(block.lines[0].spans[0].font, "Courier");
    }

    #[test]
    fn test_reflow_collapses_blank_runs() {
        let block = Block::new(
            BlockType::Code,
            vec![
                line_at("a", 0.0, 0.0, 8.0, 8.0),
                line_at(" ", 0.0, 10.0, 8.0, 8.0),
                line_at(" ", 0.0, 20.0, 8.0, 8.0),
                line_at("b", 0.0, 30.0, 8.0, 8.0),
            ],
            0,
        );
        assert_eq!(reflow_code_text(&block), "a\n \nb");
    }

    #[test]
    fn test_font_statistics() {
        let doc = doc_with(vec![code_block()]);
        let stats = FontStatistics::collect(&doc).unwrap();
        assert_eq!(stats.mean_font_size, 8.0);
        assert_eq!(stats.median_line_height, 8.0);
        assert!(FontStatistics::collect(&Document::new("empty")).is_none());
    }
}
