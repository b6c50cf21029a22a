//! Markdown rendering for fused documents.

use crate::error::Result;
use crate::model::{Block, BlockType, Document, Line, Page, Span};

use super::{CleanupPipeline, RenderOptions, RenderResult, RenderStats};

/// Convert a document to Markdown.
pub fn to_markdown(doc: &Document, options: &RenderOptions) -> Result<String> {
    let renderer = MarkdownRenderer::new(options.clone());
    renderer.render(doc)
}

/// Convert a document to Markdown with statistics.
pub fn to_markdown_with_stats(doc: &Document, options: &RenderOptions) -> Result<RenderResult> {
    let mut options = options.clone();
    options.collect_stats = true;
    let renderer = MarkdownRenderer::new(options);
    renderer.render_with_stats(doc)
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
    stats: RenderStats,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            stats: RenderStats::new(),
        }
    }

    /// Render a document to Markdown.
    pub fn render(mut self, doc: &Document) -> Result<String> {
        self.render_internal(doc)
    }

    /// Render a document to Markdown with statistics.
    pub fn render_with_stats(mut self, doc: &Document) -> Result<RenderResult> {
        self.options.collect_stats = true;
        let content = self.render_internal(doc)?;
        self.stats.count_text(&content);
        Ok(RenderResult::new(content, self.stats))
    }

    fn render_internal(&mut self, doc: &Document) -> Result<String> {
        let pages: Vec<String> = doc
            .pages
            .iter()
            .map(|page| self.render_page(page).trim_end().to_string())
            .filter(|text| !text.trim().is_empty())
            .collect();
        let mut output = pages.join("\n\n");

        if let Some(ref cleanup_options) = self.options.cleanup {
            let pipeline = CleanupPipeline::new(cleanup_options.clone());
            output = pipeline.process(&output);
        }

        Ok(output.trim().to_string())
    }

    fn render_page(&mut self, page: &Page) -> String {
        if self.options.collect_stats {
            self.stats.page_count += 1;
        }
        let mut output = String::new();
        for block in &page.blocks {
            self.render_block(&mut output, block);
        }
        output
    }

    fn render_block(&mut self, output: &mut String, block: &Block) {
        let collect = self.options.collect_stats;
        if collect {
            self.stats.image_count += block.spans().filter(|s| s.image).count() as u32;
        }

        match block.block_type {
            BlockType::Title | BlockType::SectionHeader => {
                let text = self.merge_lines(block, false);
                if text.is_empty() {
                    return;
                }
                if collect {
                    self.stats.heading_count += 1;
                }
                let prefix = if block.block_type == BlockType::Title { "#" } else { "##" };
                output.push_str(&format!("{} {}\n\n", prefix, text));
            }
            BlockType::Code => {
                let text = block
                    .lines
                    .iter()
                    .map(Line::prelim_text)
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.trim().is_empty() {
                    return;
                }
                if collect {
                    self.stats.code_count += 1;
                }
                output.push_str(&format!("```\n{}\n```\n\n", text.trim_end()));
            }
            BlockType::Formula => {
                let text = self.merge_lines(block, false);
                if text.is_empty() {
                    return;
                }
                if collect {
                    self.stats.equation_count += 1;
                }
                output.push_str(&format!("$$\n{}\n$$\n\n", text));
            }
            BlockType::Text | BlockType::Figure => {
                let text = self.merge_lines(block, self.options.emphasis);
                if text.trim().is_empty() {
                    return;
                }
                if collect && block.block_type == BlockType::Text {
                    self.stats.paragraph_count += 1;
                }
                output.push_str(&text);
                output.push_str("\n\n");
            }
        }
    }

    /// Join a block's lines into one paragraph, de-hyphenating line ends.
    fn merge_lines(&self, block: &Block, emphasis: bool) -> String {
        let mut merged = String::new();
        for line in &block.lines {
            let text = self.render_line(line, emphasis);
            let holds_image = line.spans.iter().any(|s| s.image);
            let text = if holds_image { text.as_str() } else { text.trim() };
            if text.is_empty() {
                continue;
            }

            if merged.is_empty() {
                merged.push_str(text);
            } else if self.options.dehyphenate
                && merged.ends_with('-')
                && text.chars().next().is_some_and(char::is_lowercase)
            {
                merged.pop();
                merged.push_str(text);
            } else {
                if !merged.ends_with('\n') && !text.starts_with('\n') {
                    merged.push(' ');
                }
                merged.push_str(text);
            }
        }
        merged
    }

    fn render_line(&self, line: &Line, emphasis: bool) -> String {
        line.spans
            .iter()
            .map(|span| self.render_span(span, emphasis))
            .collect()
    }

    fn render_span(&self, span: &Span, emphasis: bool) -> String {
        if span.image {
            if self.options.image_path_prefix.is_empty() {
                return span.text.clone();
            }
            return span
                .text
                .replace("](", &format!("]({}", self.options.image_path_prefix));
        }
        if emphasis {
            emphasize(&span.text, span.bold, span.italic)
        } else {
            span.text.clone()
        }
    }
}

/// Wrap `text` in emphasis markers, keeping surrounding whitespace outside them.
fn emphasize(text: &str, bold: bool, italic: bool) -> String {
    let marker = match (bold, italic) {
        (true, true) => "***",
        (true, false) => "**",
        (false, true) => "*",
        (false, false) => return text.to_string(),
    };
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();
    format!("{}{}{}{}{}", &text[..start], marker, core, marker, &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn span(text: &str) -> Span {
        Span::new(text, BBox::new(0.0, 0.0, 10.0, 10.0))
    }

    fn doc_of(blocks: Vec<(BlockType, Vec<Vec<Span>>)>) -> Document {
        let mut doc = Document::new("md");
        let mut page = Page::letter(0);
        for (block_type, lines) in blocks {
            let lines = lines.into_iter().map(Line::new).collect();
            page.add_block(Block::new(block_type, lines, 0));
        }
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_emphasize() {
        assert_eq!(emphasize("word ", true, false), "**word** ");
        assert_eq!(emphasize(" both", true, true), " ***both***");
        assert_eq!(emphasize("  ", false, true), "  ");
        assert_eq!(emphasize("plain", false, false), "plain");
    }

    #[test]
    fn test_block_types() {
        let doc = doc_of(vec![
            (BlockType::Title, vec![vec![span("A Title")]]),
            (BlockType::SectionHeader, vec![vec![span("1 Intro")]]),
            (BlockType::Text, vec![vec![span("Body infor-")], vec![span("mation here.")]]),
            (BlockType::Code, vec![vec![span("fn main() {\n    run();\n}")]]),
            (BlockType::Formula, vec![vec![span("E = mc^2")]]),
        ]);
        let md = to_markdown(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(
            md,
            "# A Title\n\n## 1 Intro\n\nBody information here.\n\n```\nfn main() {\n    run();\n}\n```\n\n$$\nE = mc^2\n$$"
        );
    }

    #[test]
    fn test_hyphen_before_uppercase_kept() {
        let doc = doc_of(vec![(
            BlockType::Text,
            vec![vec![span("North-")], vec![span("South")]],
        )]);
        let md = to_markdown(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(md, "North- South");
    }

    #[test]
    fn test_image_reference_passes_through() {
        let mut image = span("\n\n![0_image_0.png](0_image_0.png)\n\n");
        image.image = true;
        let doc = doc_of(vec![(
            BlockType::Text,
            vec![vec![span("Before")], vec![image], vec![span("after")]],
        )]);

        let md = to_markdown(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(md, "Before\n\n![0_image_0.png](0_image_0.png)\n\nafter");

        let prefixed = RenderOptions::new().with_image_prefix("images/");
        let md = to_markdown(&doc, &prefixed).unwrap();
        assert!(md.contains("![0_image_0.png](images/0_image_0.png)"));
    }

    #[test]
    fn test_bold_spans_in_body() {
        let mut bold = span("Note:");
        bold.bold = true;
        let doc = doc_of(vec![(BlockType::Text, vec![vec![bold, span(" read this")]])]);
        let md = to_markdown(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(md, "**Note:** read this");
    }

    #[test]
    fn test_stats_and_page_join() {
        let mut doc = doc_of(vec![(BlockType::Text, vec![vec![span("one")]])]);
        let mut page = Page::letter(1);
        page.add_block(Block::new(BlockType::Formula, vec![Line::new(vec![span("x")])], 1));
        doc.add_page(page);

        let result = to_markdown_with_stats(&doc, &RenderOptions::default()).unwrap();
        assert_eq!(result.content, "one\n\n$$\nx\n$$");
        assert_eq!(result.stats.page_count, 2);
        assert_eq!(result.stats.paragraph_count, 1);
        assert_eq!(result.stats.equation_count, 1);
    }
}
