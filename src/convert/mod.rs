//! The fusion pipeline: run every stage over one document and render it.
//!
//! # Example
//!
//! ```no_run
//! use docfuse::convert::DocFuse;
//!
//! fn main() -> docfuse::Result<()> {
//!     let result = DocFuse::new().with_images(false).convert_file("paper.json")?;
//!     println!("{}", result.markdown);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod output;

use crate::cleaners::{
    filter_common_titles, filter_header_footer, find_bold_italic, identify_code_blocks,
    indent_blocks, remove_spans,
};
use crate::debug;
use crate::equations::replace_equations;
use crate::error::{Error, Result};
use crate::images::{extract_images, images_to_map};
use crate::layout::{sort_blocks_in_reading_order, split_heading_blocks};
use crate::model::{Document, Resource};
use crate::models::{run_detection, ModelSet};
use crate::ocr::{lang::resolve_langs, run_ocr};
use crate::options::FusionOptions;
use crate::render::{to_markdown, CleanupPreset, RenderOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Counters collected while fusing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionStats {
    /// Text blocks reclassified as code
    pub code_blocks: usize,

    /// Heading lines split out of text blocks
    pub heading_splits: usize,

    /// Formula regions spliced
    pub equations: usize,

    /// Equation predictions accepted
    pub equations_successful: usize,

    /// Equation predictions rejected
    pub equations_unsuccessful: usize,

    /// Formula blocks dropped for having no text
    pub equations_dropped: usize,

    /// Figure snapshots extracted
    pub images: usize,

    /// Pages sent to OCR
    pub ocr_pages: usize,

    /// OCR results kept
    pub ocr_success: usize,

    /// OCR results rejected or failed
    pub ocr_failed: usize,

    /// Header and footer spans removed
    pub boilerplate_spans: usize,

    /// Repeating title blocks removed
    pub duplicate_titles: usize,

    /// Pages in the document
    pub pages: usize,
}

impl FusionStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another run's counters to this one.
    pub fn merge(&mut self, other: &FusionStats) {
        self.code_blocks += other.code_blocks;
        self.heading_splits += other.heading_splits;
        self.equations += other.equations;
        self.equations_successful += other.equations_successful;
        self.equations_unsuccessful += other.equations_unsuccessful;
        self.equations_dropped += other.equations_dropped;
        self.images += other.images;
        self.ocr_pages += other.ocr_pages;
        self.ocr_success += other.ocr_success;
        self.ocr_failed += other.ocr_failed;
        self.boilerplate_spans += other.boilerplate_spans;
        self.duplicate_titles += other.duplicate_titles;
        self.pages += other.pages;
    }
}

/// Output of [`convert_document`].
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Rendered and cleaned Markdown
    pub markdown: String,

    /// Figure snapshots keyed by the filename the Markdown references
    pub images: BTreeMap<String, Resource>,

    /// What each stage did
    pub stats: FusionStats,

    /// The fused document
    pub document: Document,
}

impl ConvertResult {
    /// Get the Markdown length in bytes.
    pub fn content_len(&self) -> usize {
        self.markdown.len()
    }
}

fn default_render_options() -> RenderOptions {
    RenderOptions::new().with_cleanup_preset(CleanupPreset::Standard)
}

/// Fuse a document with the default rendering options.
pub fn convert_document(
    doc: Document,
    models: &ModelSet,
    options: &FusionOptions,
) -> Result<ConvertResult> {
    convert_document_with(doc, models, options, &default_render_options())
}

/// Fuse a document: detection, OCR, cleaning, splicing, ordering, then Markdown.
pub fn convert_document_with(
    mut doc: Document,
    models: &ModelSet,
    options: &FusionOptions,
    render_options: &RenderOptions,
) -> Result<ConvertResult> {
    let requested = if options.languages.is_empty() {
        &doc.languages
    } else {
        &options.languages
    };
    let languages = resolve_langs(requested, options.ocr_engine)?;

    select_pages(&mut doc, options)?;

    let mut stats = FusionStats {
        pages: doc.page_count(),
        ..Default::default()
    };
    log::info!("Fusing {} ({} pages)", doc.name, stats.pages);

    run_detection(&mut doc, models, options)?;

    let ocr = run_ocr(&mut doc, models, &languages, options)?;
    stats.ocr_pages = ocr.ocr_pages;
    stats.ocr_success = ocr.ocr_success;
    stats.ocr_failed = ocr.ocr_failed;

    find_bold_italic(&mut doc, options);

    stats.code_blocks = identify_code_blocks(&mut doc, options);
    indent_blocks(&mut doc);

    stats.heading_splits = split_heading_blocks(&mut doc, options);

    let equations = replace_equations(&mut doc, models, options)?;
    stats.equations = equations.equations;
    stats.equations_successful = equations.successful;
    stats.equations_unsuccessful = equations.unsuccessful;
    stats.equations_dropped = equations.dropped;

    stats.images = extract_images(&mut doc, models, options)?;

    sort_blocks_in_reading_order(&mut doc, options);

    let boilerplate = filter_header_footer(&doc, options);
    stats.boilerplate_spans = remove_spans(&mut doc, &boilerplate);
    stats.duplicate_titles = filter_common_titles(&mut doc, options);

    debug::dump_bbox_debug_data(&doc, options)?;

    let markdown = to_markdown(&doc, render_options)?;
    let images = images_to_map(&doc.pages);

    log::info!(
        "Fused {}: {} code blocks, {} equations ({} recognized), {} images",
        doc.name,
        stats.code_blocks,
        stats.equations,
        stats.equations_successful,
        stats.images
    );

    Ok(ConvertResult {
        markdown,
        images,
        stats,
        document: doc,
    })
}

/// Keep only the pages in the configured range.
///
/// Pages keep their original `pnum`, so image names still point at the source page.
fn select_pages(doc: &mut Document, options: &FusionOptions) -> Result<()> {
    let total = doc.page_count();
    if total > 0 && options.start_page >= total {
        return Err(Error::PageOutOfRange(options.start_page, total));
    }
    let range = options.page_range(total);
    if range.len() == total {
        return Ok(());
    }
    doc.pages.truncate(range.end);
    doc.pages.drain(..range.start);
    log::debug!("{}: fusing pages {}..{} of {}", doc.name, range.start, range.end, total);
    Ok(())
}

/// Load a document from its JSON file.
///
/// A document without a name takes the file stem.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let mut doc = Document::from_json(&json)?;
    if doc.name.is_empty() {
        doc.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
    }
    Ok(doc)
}

/// Builder for fusing documents.
///
/// # Example
///
/// ```no_run
/// use docfuse::convert::DocFuse;
/// use docfuse::CleanupPreset;
///
/// let result = DocFuse::new()
///     .with_languages(["English"])
///     .with_cleanup(CleanupPreset::Minimal)
///     .convert_file("paper.json")?;
/// # Ok::<(), docfuse::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocFuse {
    models: ModelSet,
    options: FusionOptions,
    render_options: RenderOptions,
}

impl DocFuse {
    /// Create a builder with no models and default options.
    pub fn new() -> Self {
        Self {
            models: ModelSet::new(),
            options: FusionOptions::default(),
            render_options: default_render_options(),
        }
    }

    /// Use these model collaborators.
    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    /// Replace the fusion options.
    pub fn with_options(mut self, options: FusionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the rendering options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Set the cleanup preset.
    pub fn with_cleanup(mut self, preset: CleanupPreset) -> Self {
        self.render_options = self.render_options.with_cleanup_preset(preset);
        self
    }

    /// Enable or disable figure extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.options = self.options.with_images(extract);
        self
    }

    /// Set the OCR languages, overriding the document's own.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.with_languages(languages);
        self
    }

    /// Fuse a document.
    pub fn convert(&self, doc: Document) -> Result<ConvertResult> {
        convert_document_with(doc, &self.models, &self.options, &self.render_options)
    }

    /// Fuse a document given as JSON.
    pub fn convert_json(&self, json: &str) -> Result<ConvertResult> {
        self.convert(Document::from_json(json)?)
    }

    /// Fuse a document JSON file.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<ConvertResult> {
        self.convert(load_document(path)?)
    }

    /// The fusion options in use.
    pub fn options(&self) -> &FusionOptions {
        &self.options
    }
}

impl Default for DocFuse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Block, BlockType, Layout, LayoutRegion, Line, Page, RegionLabel, Span};
    use crate::models::PageRenderer;
    use std::sync::Arc;

    fn simple_doc() -> Document {
        let mut doc = Document::new("simple");
        let mut page = Page::letter(0);
        let span = Span::new("A plain paragraph of text.", BBox::new(72.0, 100.0, 300.0, 112.0));
        page.add_block(Block::new(BlockType::Text, vec![Line::new(vec![span])], 0));
        doc.add_page(page);
        doc
    }

    #[test]
    fn test_stats_merge() {
        let mut a = FusionStats {
            pages: 3,
            equations: 2,
            ..Default::default()
        };
        let b = FusionStats {
            pages: 4,
            equations: 1,
            equations_dropped: 1,
            images: 5,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.pages, 7);
        assert_eq!(a.equations, 3);
        assert_eq!(a.equations_dropped, 1);
        assert_eq!(a.images, 5);
    }

    #[test]
    fn test_convert_without_models() {
        let result = convert_document(simple_doc(), &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert_eq!(result.markdown, "A plain paragraph of text.");
        assert_eq!(result.stats.pages, 1);
        assert!(result.images.is_empty());
    }

    #[test]
    fn test_invalid_language_rejected() {
        let doc = simple_doc();
        let options = FusionOptions::default().with_languages(["klingon"]);
        let err = convert_document(doc, &ModelSet::new(), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidLanguage { .. }));
    }

    #[test]
    fn test_document_languages_used() {
        let mut doc = simple_doc();
        doc.languages = vec!["xx-invalid".to_string()];
        assert!(DocFuse::new().convert(doc).is_err());
    }

    struct PngRenderer;

    impl PageRenderer for PngRenderer {
        fn render_page(&self, _page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![0x89]))
        }
    }

    const PAGE_TEXT: [&str; 5] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];

    fn figure_doc() -> Document {
        let mut doc = Document::new("ranged");
        for (p, word) in PAGE_TEXT.iter().enumerate() {
            let mut page = Page::letter(p);
            let text = format!("{} paragraph body.", word);
            let span = Span::new(text, BBox::new(72.0, 100.0, 300.0, 112.0));
            page.add_block(Block::new(BlockType::Text, vec![Line::new(vec![span])], p));
            page.layout = Some(Layout {
                image_bbox: page.bbox,
                bboxes: vec![LayoutRegion {
                    bbox: BBox::new(72.0, 400.0, 300.0, 500.0),
                    label: RegionLabel::Figure,
                }],
            });
            doc.add_page(page);
        }
        doc
    }

    #[test]
    fn test_page_range_limits_fusion() {
        let models = ModelSet::new().with_renderer(Arc::new(PngRenderer));
        let options = FusionOptions::default().with_page_range(1, Some(2));
        let result = convert_document(figure_doc(), &models, &options).unwrap();

        assert_eq!(result.stats.pages, 2);
        assert_eq!(result.stats.images, 2);
        assert!(result.markdown.contains("Bravo paragraph body."));
        assert!(result.markdown.contains("Charlie paragraph body."));
        for skipped in ["Alpha", "Delta", "Echo"] {
            assert!(!result.markdown.contains(skipped), "{} should not be fused", skipped);
        }

        let names: Vec<&String> = result.images.keys().collect();
        assert_eq!(names, vec!["1_image_0.png", "2_image_0.png"]);
        assert!(result.markdown.contains("![1_image_0.png](1_image_0.png)"));
        let pnums: Vec<usize> = result.document.pages.iter().map(|p| p.pnum).collect();
        assert_eq!(pnums, vec![1, 2]);
    }

    #[test]
    fn test_page_range_past_end() {
        let options = FusionOptions::default().with_page_range(5, None);
        let err = convert_document(figure_doc(), &ModelSet::new(), &options).unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange(5, 5)));

        let options = FusionOptions::default().with_page_range(3, Some(10));
        let result = convert_document(figure_doc(), &ModelSet::new(), &options).unwrap();
        assert_eq!(result.stats.pages, 2);
        assert!(result.markdown.contains("Echo paragraph body."));
    }

    #[test]
    fn test_empty_formula_reported_in_stats() {
        let mut doc = simple_doc();
        let page = &mut doc.pages[0];
        page.layout = Some(Layout {
            image_bbox: page.bbox,
            bboxes: vec![LayoutRegion {
                bbox: BBox::new(72.0, 600.0, 300.0, 640.0),
                label: RegionLabel::Formula,
            }],
        });
        let result = convert_document(doc, &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert_eq!(result.stats.equations, 1);
        assert_eq!(result.stats.equations_dropped, 1);
        assert_eq!(result.markdown, "A plain paragraph of text.");
    }

    #[test]
    fn test_builder() {
        let fuse = DocFuse::new().with_images(false).with_languages(["English"]);
        assert!(!fuse.options().extract_images);
        assert_eq!(fuse.options().languages, vec!["English".to_string()]);
    }

    #[test]
    fn test_load_document_names_from_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut doc = simple_doc();
        doc.name.clear();
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded.name, "report");
        assert_eq!(loaded.page_count(), 1);
    }
}
