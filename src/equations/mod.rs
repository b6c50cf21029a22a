//! Equation regions: splice Formula blocks into the page and recognize their LaTeX.
//!
//! Lines covered by a Formula layout region are lifted out of their blocks and
//! replaced by a single-span Formula block holding their joined text. When a
//! renderer and an equation model are available, each region is rendered and
//! recognized; accepted predictions overwrite the fallback text.

mod inference;

pub use inference::{is_valid_prediction, recognize_batched};

use crate::debug;
use crate::error::Result;
use crate::layout::splice::{anchor_after_removal, fallback_anchor, insert_block, match_lines};
use crate::model::{BBox, Block, BlockId, BlockType, Document, Line, LineId, Page, RegionLabel, Span};
use crate::models::ModelSet;
use crate::options::FusionOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Counters reported by [`replace_equations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationStats {
    /// Formula regions spliced into the document
    pub equations: usize,
    /// Regions whose prediction was accepted
    pub successful: usize,
    /// Regions recognized but rejected
    pub unsuccessful: usize,
    /// Formula blocks dropped for having no text
    #[serde(default)]
    pub dropped: usize,
}

/// A spliced Formula block waiting for recognition.
#[derive(Debug, Clone)]
struct Candidate {
    page: usize,
    block: BlockId,
    bbox: BBox,
    text: String,
    tokens: usize,
}

fn formula_block(text: String, region: BBox, pnum: usize) -> Block {
    let span = Span {
        text,
        bbox: region,
        font: "Latex".to_string(),
        ..Default::default()
    };
    Block::new(BlockType::Formula, vec![Line::new(vec![span])], pnum)
}

/// Splice one page. Returns the inserted blocks with their region and original text.
fn splice_page(page: &mut Page, thresh: f32) -> Vec<(BlockId, BBox, String)> {
    let regions = page.layout_regions(&[RegionLabel::Formula]);
    let mut claimed: HashSet<LineId> = HashSet::new();
    let mut spliced = Vec::with_capacity(regions.len());

    for region in regions {
        let matched = match_lines(page, &region.bbox, thresh);
        let free: Vec<_> = matched
            .iter()
            .copied()
            .filter(|&(bi, li)| !claimed.contains(&page.blocks[bi].lines[li].id))
            .collect();

        if free.is_empty() && !matched.is_empty() {
            log::debug!(
                "Page {}: formula region {:?} only covers lines already claimed",
                page.pnum,
                region.bbox
            );
            continue;
        }

        let removed: HashSet<LineId> = free
            .iter()
            .map(|&(bi, li)| page.blocks[bi].lines[li].id)
            .collect();
        let anchor = match free.first() {
            Some(&first) => anchor_after_removal(page, first, &removed),
            None => fallback_anchor(page, &region.bbox),
        };

        let text = free
            .iter()
            .map(|&(bi, li)| page.blocks[bi].lines[li].prelim_text())
            .collect::<Vec<_>>()
            .join(" ")
            .replace('\n', " ");

        for block in &mut page.blocks {
            block.lines.retain(|l| !removed.contains(&l.id));
        }
        claimed.extend(removed);

        let block = formula_block(text.clone(), region.bbox, page.pnum);
        claimed.extend(block.lines.iter().map(|l| l.id));
        let id = block.id;
        insert_block(page, anchor, block);
        spliced.push((id, region.bbox, text));
    }
    spliced
}

fn set_block_text(page: &mut Page, id: BlockId, text: String) {
    let Some(bi) = page.block_index(id) else {
        return;
    };
    if let Some(span) = page.blocks[bi]
        .lines
        .first_mut()
        .and_then(|line| line.spans.first_mut())
    {
        span.text = text;
    }
}

/// Drop Formula blocks left without text.
fn drop_empty_formulas(page: &mut Page) -> usize {
    let before = page.blocks.len();
    page.blocks.retain(|b| {
        let empty = b.block_type == BlockType::Formula && b.prelim_text().trim().is_empty();
        if empty {
            log::warn!("Page {}: dropping formula block {} with no text", b.pnum, b.id);
        }
        !empty
    });
    before - page.blocks.len()
}

/// Splice every Formula region and recognize the spliced blocks.
pub fn replace_equations(
    doc: &mut Document,
    models: &ModelSet,
    options: &FusionOptions,
) -> Result<EquationStats> {
    let mut stats = EquationStats::default();
    let token_limit = models
        .equations
        .as_ref()
        .map(|m| options.texify_model_max.min(m.max_tokens()))
        .unwrap_or(options.texify_model_max);

    let mut candidates = Vec::new();
    for (idx, page) in doc.pages.iter_mut().enumerate() {
        for (block, bbox, text) in splice_page(page, options.bbox_intersection_thresh) {
            stats.equations += 1;
            let tokens = models
                .equations
                .as_ref()
                .map(|m| m.count_tokens(&text))
                .unwrap_or(0);
            candidates.push(Candidate {
                page: idx,
                block,
                bbox,
                text,
                tokens,
            });
        }
    }

    match (&models.renderer, &models.equations) {
        (Some(renderer), Some(model)) if !candidates.is_empty() => {
            let queued: Vec<&Candidate> = candidates.iter().filter(|c| c.tokens < token_limit).collect();
            let images = queued
                .iter()
                .map(|c| renderer.render_region(&doc.pages[c.page], &c.bbox, options.texify_dpi))
                .collect::<Result<Vec<_>>>()?;
            let counts: Vec<usize> = queued.iter().map(|c| c.tokens).collect();

            let predictions = recognize_batched(model.as_ref(), &images, &counts, token_limit, options)?;

            if options.debug_level >= 1 {
                let bboxes: Vec<BBox> = queued.iter().map(|c| c.bbox).collect();
                debug::dump_equation_debug_data(&doc.name, &images, &predictions, &bboxes, options)?;
            }

            for (candidate, prediction) in queued.into_iter().zip(predictions) {
                if is_valid_prediction(model.as_ref(), &prediction, &candidate.text, token_limit) {
                    set_block_text(&mut doc.pages[candidate.page], candidate.block, prediction);
                    stats.successful += 1;
                } else {
                    log::debug!("Rejected equation prediction on page {}", candidate.page);
                    stats.unsuccessful += 1;
                }
            }
        }
        (None, _) | (_, None) if !candidates.is_empty() => {
            log::warn!(
                "{} equation regions kept their extracted text: no renderer or equation model",
                candidates.len()
            );
        }
        _ => {}
    }

    for page in &mut doc.pages {
        stats.dropped += drop_empty_formulas(page);
        page.prune_empty();
    }

    log::info!(
        "Equations: {} found, {} recognized, {} rejected, {} dropped empty",
        stats.equations,
        stats.successful,
        stats.unsuccessful,
        stats.dropped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layout, LayoutRegion, Resource};
    use crate::models::{EquationModel, PageRenderer};
    use std::sync::Arc;

    struct Renderer;

    impl PageRenderer for Renderer {
        fn render_page(&self, _page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![1]))
        }
    }

    struct Fixed(&'static str);

    impl EquationModel for Fixed {
        fn max_tokens(&self) -> usize {
            384
        }

        fn count_tokens(&self, text: &str) -> usize {
            text.chars().count()
        }

        fn recognize(&self, images: &[Resource], _max_length: usize) -> Result<Vec<String>> {
            Ok(images.iter().map(|_| self.0.to_string()).collect())
        }
    }

    fn page_with_formula(region: BBox) -> Document {
        let mut page = Page::letter(0);
        let lines = [("before", 100.0), ("E = mc2", 120.0), ("after", 140.0)]
            .iter()
            .map(|(t, y)| Line::new(vec![Span::new(*t, BBox::new(50.0, *y, 400.0, y + 12.0))]))
            .collect();
        page.add_block(Block::new(BlockType::Text, lines, 0));
        page.layout = Some(Layout {
            image_bbox: page.bbox,
            bboxes: vec![LayoutRegion { bbox: region, label: RegionLabel::Formula }],
        });
        let mut doc = Document::new("eq");
        doc.add_page(page);
        doc
    }

    fn summary(doc: &Document) -> Vec<(BlockType, String)> {
        doc.blocks().map(|b| (b.block_type, b.prelim_text())).collect()
    }

    #[test]
    fn test_fallback_block_without_models() {
        let mut doc = page_with_formula(BBox::new(40.0, 118.0, 420.0, 134.0));
        let stats = replace_equations(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap();

        assert_eq!(stats.equations, 1);
        assert_eq!(stats.successful, 0);
        assert_eq!(
            summary(&doc),
            vec![
                (BlockType::Text, "before".to_string()),
                (BlockType::Formula, "E = mc2".to_string()),
                (BlockType::Text, "after".to_string()),
            ]
        );
        let formula = &doc.pages[0].blocks[1];
        assert_eq!(formula.bbox, BBox::new(40.0, 118.0, 420.0, 134.0));
        assert_eq!(formula.lines[0].spans[0].font, "Latex");
    }

    #[test]
    fn test_accepted_prediction_replaces_text() {
        let mut doc = page_with_formula(BBox::new(40.0, 118.0, 420.0, 134.0));
        let models = ModelSet::new()
            .with_renderer(Arc::new(Renderer))
            .with_equations(Arc::new(Fixed("E = mc^2")));
        let stats = replace_equations(&mut doc, &models, &FusionOptions::default()).unwrap();

        assert_eq!(stats.successful, 1);
        assert_eq!(doc.pages[0].blocks[1].prelim_text(), "E = mc^2");
    }

    #[test]
    fn test_rejected_prediction_keeps_original() {
        let mut doc = page_with_formula(BBox::new(40.0, 118.0, 420.0, 134.0));
        let models = ModelSet::new()
            .with_renderer(Arc::new(Renderer))
            .with_equations(Arc::new(Fixed("E")));
        let stats = replace_equations(&mut doc, &models, &FusionOptions::default()).unwrap();

        assert_eq!(stats.unsuccessful, 1);
        assert_eq!(doc.pages[0].blocks[1].prelim_text(), "E = mc2");
    }

    #[test]
    fn test_unmatched_region_without_models_is_dropped() {
        let mut doc = page_with_formula(BBox::new(40.0, 600.0, 420.0, 640.0));
        let stats = replace_equations(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert_eq!(stats.equations, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(doc.pages[0].blocks.len(), 1);
        assert_eq!(doc.pages[0].blocks[0].lines.len(), 3);
    }

    #[test]
    fn test_rejected_empty_region_is_dropped() {
        let mut doc = page_with_formula(BBox::new(40.0, 600.0, 420.0, 640.0));
        let models = ModelSet::new()
            .with_renderer(Arc::new(Renderer))
            .with_equations(Arc::new(Fixed("")));
        let stats = replace_equations(&mut doc, &models, &FusionOptions::default()).unwrap();

        assert_eq!(stats.unsuccessful, 1);
        assert_eq!(stats.dropped, 1);
        assert!(doc.blocks().all(|b| b.block_type != BlockType::Formula));
    }

    #[test]
    fn test_matched_formula_not_counted_as_dropped() {
        let mut doc = page_with_formula(BBox::new(40.0, 118.0, 420.0, 134.0));
        let stats = replace_equations(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn test_unmatched_region_recognized_at_nearest_block() {
        let mut doc = page_with_formula(BBox::new(40.0, 600.0, 420.0, 640.0));
        let models = ModelSet::new()
            .with_renderer(Arc::new(Renderer))
            .with_equations(Arc::new(Fixed("\\int_0^1 f")));
        replace_equations(&mut doc, &models, &FusionOptions::default()).unwrap();
        assert_eq!(doc.pages[0].blocks[0].block_type, BlockType::Formula);
        assert_eq!(doc.pages[0].blocks[0].prelim_text(), "\\int_0^1 f");
    }

    #[test]
    fn test_overlapping_regions_claim_lines_once() {
        let mut doc = page_with_formula(BBox::new(40.0, 118.0, 420.0, 134.0));
        if let Some(layout) = doc.pages[0].layout.as_mut() {
            layout.bboxes.push(LayoutRegion {
                bbox: BBox::new(40.0, 116.0, 420.0, 136.0),
                label: RegionLabel::Formula,
            });
        }
        let stats = replace_equations(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert_eq!(stats.equations, 1);
        let formulas = doc.blocks().filter(|b| b.block_type == BlockType::Formula).count();
        assert_eq!(formulas, 1);
    }
}
