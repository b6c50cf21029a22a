//! Page OCR: select pages, recognize them in parallel and keep the good results.

use super::heuristics::{detect_bad_ocr, no_text_found, should_ocr_page};
use crate::error::{Error, Result};
use crate::model::{Block, Document, Page};
use crate::models::{ModelSet, OcrEngine, PageRenderer};
use crate::options::FusionOptions;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Counters reported by [`run_ocr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrStats {
    /// Pages selected for OCR
    pub ocr_pages: usize,
    /// Pages whose OCR text replaced the extracted text
    pub ocr_success: usize,
    /// Pages whose OCR failed or was rejected
    pub ocr_failed: usize,
}

fn recognize_page(
    page: &Page,
    renderer: &dyn PageRenderer,
    engine: &dyn OcrEngine,
    languages: &[String],
    dpi: u32,
) -> Result<Vec<Block>> {
    let image = renderer.render_page(page, dpi)?;
    engine.recognize(page, &image, languages)
}

/// Text of `blocks` as it would read on the page.
fn blocks_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .flat_map(|b| b.lines.iter())
        .map(|l| l.prelim_text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indices of pages that need OCR.
pub fn select_ocr_pages(doc: &Document, options: &FusionOptions) -> Vec<usize> {
    let no_text = no_text_found(&doc.pages);
    doc.pages
        .iter()
        .enumerate()
        .filter(|(_, page)| should_ocr_page(page, no_text, options))
        .map(|(idx, _)| idx)
        .collect()
}

/// OCR the pages that need it, replacing their blocks when the result is usable.
///
/// Pages are recognized on a pool of `ocr_parallel_workers` threads; each
/// result goes back to the page it came from. A failed or rejected page keeps
/// its extracted text.
pub fn run_ocr(
    doc: &mut Document,
    models: &ModelSet,
    languages: &[String],
    options: &FusionOptions,
) -> Result<OcrStats> {
    let selected = select_ocr_pages(doc, options);
    if selected.is_empty() {
        return Ok(OcrStats::default());
    }
    let (Some(renderer), Some(engine)) = (&models.renderer, &models.ocr) else {
        log::warn!(
            "{} pages need OCR but no renderer or OCR engine is configured",
            selected.len()
        );
        return Ok(OcrStats::default());
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.ocr_parallel_workers.max(1))
        .build()
        .map_err(|e| Error::Other(format!("Failed to build OCR pool: {}", e)))?;

    let pages = &doc.pages;
    let results: Vec<(usize, Result<Vec<Block>>)> = pool.install(|| {
        selected
            .par_iter()
            .map(|&idx| {
                let result = recognize_page(
                    &pages[idx],
                    renderer.as_ref(),
                    engine.as_ref(),
                    languages,
                    options.ocr_dpi,
                );
                (idx, result)
            })
            .collect()
    });

    let mut stats = OcrStats {
        ocr_pages: selected.len(),
        ..Default::default()
    };
    for (idx, result) in results {
        let page = &mut doc.pages[idx];
        let mut blocks = match result {
            Ok(blocks) => blocks,
            Err(e) => {
                log::warn!("OCR failed on page {}: {}", page.pnum, e);
                stats.ocr_failed += 1;
                continue;
            }
        };

        let text = blocks_text(&blocks);
        if text.is_empty() || detect_bad_ocr(&text, options) {
            log::debug!("Rejected OCR text for page {}", page.pnum);
            stats.ocr_failed += 1;
            continue;
        }

        for block in &mut blocks {
            block.pnum = page.pnum;
        }
        page.blocks = blocks;
        page.ocr_method = Some(engine.name().to_string());
        page.recompute_bboxes();
        stats.ocr_success += 1;
    }

    log::info!(
        "OCR: {} pages selected, {} replaced, {} failed",
        stats.ocr_pages,
        stats.ocr_success,
        stats.ocr_failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, BlockType, Line, Resource, Span};
    use std::sync::Arc;

    struct Renderer;

    impl PageRenderer for Renderer {
        fn render_page(&self, page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![page.pnum as u8]))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }
    }

    /// Reads page N as "Recognized page N", except page 1 which comes back garbled.
    struct Engine;

    impl OcrEngine for Engine {
        fn name(&self) -> &str {
            "mock"
        }

        fn recognize(&self, _page: &Page, image: &Resource, _languages: &[String]) -> Result<Vec<Block>> {
            let pnum = image.data[0];
            let text = if pnum == 1 {
                "%%%% ^^^^ ####".to_string()
            } else {
                format!("Recognized page {}", pnum)
            };
            let span = Span::new(text, BBox::new(10.0, 10.0, 200.0, 22.0));
            Ok(vec![Block::new(BlockType::Text, vec![Line::new(vec![span])], 99)])
        }
    }

    fn empty_doc(pages: usize) -> Document {
        let mut doc = Document::new("scan");
        for i in 0..pages {
            doc.add_page(Page::letter(i));
        }
        doc
    }

    #[test]
    fn test_all_empty_document_is_ocrd() {
        let mut doc = empty_doc(3);
        let models = ModelSet::new()
            .with_renderer(Arc::new(Renderer))
            .with_ocr(Arc::new(Engine));
        let options = FusionOptions::default().with_ocr_workers(2);

        let stats = run_ocr(&mut doc, &models, &[], &options).unwrap();
        assert_eq!(
            stats,
            OcrStats { ocr_pages: 3, ocr_success: 2, ocr_failed: 1 }
        );
        assert_eq!(doc.pages[0].prelim_text(), "Recognized page 0");
        assert_eq!(doc.pages[2].prelim_text(), "Recognized page 2");
        assert_eq!(doc.pages[2].blocks[0].pnum, 2);
        assert!(doc.pages[1].blocks.is_empty());
        assert_eq!(doc.pages[0].ocr_method.as_deref(), Some("mock"));
        assert_eq!(doc.pages[1].ocr_method, None);
    }

    #[test]
    fn test_good_text_not_selected() {
        let mut doc = empty_doc(1);
        let span = Span::new("Plain extracted text", BBox::new(0.0, 0.0, 100.0, 10.0));
        doc.pages[0].add_block(Block::new(BlockType::Text, vec![Line::new(vec![span])], 0));
        assert!(select_ocr_pages(&doc, &FusionOptions::default()).is_empty());
        assert_eq!(
            select_ocr_pages(&doc, &FusionOptions::default().with_ocr_all_pages(true)),
            vec![0]
        );
    }

    #[test]
    fn test_missing_engine_leaves_pages() {
        let mut doc = empty_doc(2);
        let stats = run_ocr(&mut doc, &ModelSet::new(), &[], &FusionOptions::default()).unwrap();
        assert_eq!(stats, OcrStats::default());
    }
}
