//! Filling the per-page model channels (layout, order, text lines) in batches.

use super::{image_bbox, ModelSet, PageRenderer};
use crate::error::{Error, Result};
use crate::model::{rescale, BBox, Document, Resource};
use crate::options::FusionOptions;

fn render_pages(
    renderer: &dyn PageRenderer,
    doc: &Document,
    pages: &[usize],
    dpi: u32,
) -> Result<Vec<Resource>> {
    pages
        .iter()
        .map(|&idx| renderer.render_page(&doc.pages[idx], dpi))
        .collect()
}

fn check_count(stage: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::model(
            stage,
            format!("expected {} predictions, got {}", expected, got),
        ));
    }
    Ok(())
}

/// Run the layout model on pages without a layout. Returns pages filled.
pub fn detect_layout(doc: &mut Document, models: &ModelSet, options: &FusionOptions) -> Result<usize> {
    let (Some(renderer), Some(model)) = (&models.renderer, &models.layout) else {
        log::debug!("Layout detection skipped: no renderer or layout model");
        return Ok(0);
    };
    let pending: Vec<usize> = doc
        .pages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.layout.is_none())
        .map(|(i, _)| i)
        .collect();

    for chunk in pending.chunks(options.layout_batch_size()) {
        let images = render_pages(renderer.as_ref(), doc, chunk, options.layout_dpi)?;
        let layouts = model.detect(&images)?;
        check_count("layout", chunk.len(), layouts.len())?;
        for (&idx, layout) in chunk.iter().zip(layouts) {
            doc.pages[idx].layout = Some(layout);
        }
    }
    Ok(pending.len())
}

/// Run the order model on pages that have a layout but no order. Returns pages filled.
///
/// Candidates are the page's layout boxes moved into the order image's space,
/// capped at `order_max_bboxes`.
pub fn detect_order(doc: &mut Document, models: &ModelSet, options: &FusionOptions) -> Result<usize> {
    let (Some(renderer), Some(model)) = (&models.renderer, &models.order) else {
        log::debug!("Reading-order detection skipped: no renderer or order model");
        return Ok(0);
    };
    let pending: Vec<usize> = doc
        .pages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.order.is_none() && p.layout.is_some())
        .map(|(i, _)| i)
        .collect();

    for chunk in pending.chunks(options.order_batch_size()) {
        let images = render_pages(renderer.as_ref(), doc, chunk, options.order_dpi)?;
        let candidates: Vec<Vec<BBox>> = chunk
            .iter()
            .zip(&images)
            .map(|(&idx, image)| {
                let page = &doc.pages[idx];
                let target = image_bbox(page, image, options.order_dpi);
                page.layout
                    .iter()
                    .flat_map(|layout| {
                        layout
                            .bboxes
                            .iter()
                            .map(move |r| rescale(&layout.image_bbox, &target, &r.bbox))
                    })
                    .take(options.order_max_bboxes)
                    .collect()
            })
            .collect();

        let orders = model.order(&images, &candidates)?;
        check_count("order", chunk.len(), orders.len())?;
        for (&idx, order) in chunk.iter().zip(orders) {
            doc.pages[idx].order = Some(order);
        }
    }
    Ok(pending.len())
}

/// Run the text-line detector on pages without detected lines. Returns pages filled.
pub fn detect_text_lines(
    doc: &mut Document,
    models: &ModelSet,
    options: &FusionOptions,
) -> Result<usize> {
    let (Some(renderer), Some(detector)) = (&models.renderer, &models.detector) else {
        log::debug!("Text line detection skipped: no renderer or detector");
        return Ok(0);
    };
    let pending: Vec<usize> = doc
        .pages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.text_lines.is_none())
        .map(|(i, _)| i)
        .collect();

    for chunk in pending.chunks(options.detector_batch_size()) {
        let images = render_pages(renderer.as_ref(), doc, chunk, options.detector_dpi)?;
        let lines = detector.detect(&images)?;
        check_count("detector", chunk.len(), lines.len())?;
        for (&idx, found) in chunk.iter().zip(lines) {
            doc.pages[idx].text_lines = Some(found);
        }
    }
    Ok(pending.len())
}

/// Fill every missing model channel: text lines, layout, then order.
pub fn run_detection(doc: &mut Document, models: &ModelSet, options: &FusionOptions) -> Result<()> {
    let lines = detect_text_lines(doc, models, options)?;
    let layouts = detect_layout(doc, models, options)?;
    let orders = detect_order(doc, models, options)?;
    log::info!(
        "Detection filled {} text-line, {} layout and {} order channels",
        lines,
        layouts,
        orders
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layout, LayoutRegion, Order, OrderBox, Page, RegionLabel};
    use crate::models::{LayoutModel, OrderModel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct SizedRenderer;

    impl PageRenderer for SizedRenderer {
        fn render_page(&self, page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![page.pnum as u8]).with_dimensions(1224, 1584))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }
    }

    struct CountingLayout {
        calls: AtomicUsize,
        short: bool,
    }

    impl LayoutModel for CountingLayout {
        fn detect(&self, images: &[Resource]) -> Result<Vec<Layout>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = if self.short { images.len() - 1 } else { images.len() };
            Ok((0..n)
                .map(|_| Layout {
                    image_bbox: BBox::new(0.0, 0.0, 1224.0, 1584.0),
                    bboxes: vec![LayoutRegion {
                        bbox: BBox::new(100.0, 100.0, 200.0, 200.0),
                        label: RegionLabel::Text,
                    }],
                })
                .collect())
        }
    }

    struct RecordingOrder {
        seen: Mutex<Vec<Vec<BBox>>>,
    }

    impl OrderModel for RecordingOrder {
        fn order(&self, images: &[Resource], candidates: &[Vec<BBox>]) -> Result<Vec<Order>> {
            self.seen.lock().unwrap().extend(candidates.iter().cloned());
            Ok(images
                .iter()
                .map(|_| Order {
                    image_bbox: BBox::new(0.0, 0.0, 1224.0, 1584.0),
                    bboxes: vec![OrderBox { bbox: BBox::new(0.0, 0.0, 1.0, 1.0), position: 0 }],
                })
                .collect())
        }
    }

    fn doc(pages: usize) -> Document {
        let mut doc = Document::new("detect");
        for i in 0..pages {
            doc.add_page(Page::letter(i));
        }
        doc
    }

    #[test]
    fn test_layout_batched_and_filled() {
        let layout = Arc::new(CountingLayout { calls: AtomicUsize::new(0), short: false });
        let models = ModelSet::new()
            .with_renderer(Arc::new(SizedRenderer))
            .with_layout(layout.clone());
        let mut doc = doc(7);
        doc.pages[3].layout = Some(Layout::default());

        let filled = detect_layout(&mut doc, &models, &FusionOptions::default()).unwrap();
        assert_eq!(filled, 6);
        assert_eq!(layout.calls.load(Ordering::SeqCst), 1);
        assert!(doc.pages.iter().all(|p| p.layout.is_some()));
        assert!(doc.pages[3].layout.as_ref().unwrap().bboxes.is_empty());
    }

    #[test]
    fn test_layout_count_mismatch_is_error() {
        let models = ModelSet::new()
            .with_renderer(Arc::new(SizedRenderer))
            .with_layout(Arc::new(CountingLayout { calls: AtomicUsize::new(0), short: true }));
        let mut doc = doc(2);
        let err = detect_layout(&mut doc, &models, &FusionOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Model { stage: "layout", .. }));
    }

    #[test]
    fn test_order_candidates_capped() {
        let order = Arc::new(RecordingOrder { seen: Mutex::new(Vec::new()) });
        let models = ModelSet::new()
            .with_renderer(Arc::new(SizedRenderer))
            .with_order(order.clone());
        let mut doc = doc(1);
        doc.pages[0].layout = Some(Layout {
            image_bbox: BBox::new(0.0, 0.0, 612.0, 792.0),
            bboxes: (0..5)
                .map(|i| LayoutRegion {
                    bbox: BBox::new(0.0, i as f32 * 10.0, 100.0, i as f32 * 10.0 + 5.0),
                    label: RegionLabel::Text,
                })
                .collect(),
        });
        let mut options = FusionOptions::default();
        options.order_max_bboxes = 3;

        assert_eq!(detect_order(&mut doc, &models, &options).unwrap(), 1);
        let seen = order.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 3);
        assert_eq!(seen[0][1], BBox::new(0.0, 20.0, 200.0, 30.0));
        assert!(doc.pages[0].order.is_some());
    }

    #[test]
    fn test_missing_models_skip() {
        let mut doc = doc(2);
        run_detection(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap();
        assert!(doc.pages.iter().all(|p| p.layout.is_none() && p.order.is_none()));
    }
}
