//! Figure and picture regions: snapshot them and reference the snapshot from the text.

use crate::error::Result;
use crate::layout::find_insert_block;
use crate::layout::splice::match_lines;
use crate::model::{BBox, Block, BlockType, Document, Line, Page, RegionLabel, Resource, Span};
use crate::models::{ModelSet, PageRenderer};
use crate::options::FusionOptions;
use std::collections::BTreeMap;

const IMAGE_LABELS: [RegionLabel; 2] = [RegionLabel::Figure, RegionLabel::Picture];

/// Stable, collision-free image name: `<page>_image_<index>.<ext>`.
pub fn image_filename(pnum: usize, index: usize, extension: &str) -> String {
    format!("{}_image_{}.{}", pnum, index, extension)
}

fn image_span(filename: &str, region: BBox) -> Span {
    Span {
        text: format!("\n\n![{0}]({0})\n\n", filename),
        bbox: region,
        font: "Image".to_string(),
        image: true,
        ..Default::default()
    }
}

fn holds_image(line: &Line) -> bool {
    line.spans.iter().any(|s| s.image)
}

fn extract_page_images(
    page: &mut Page,
    renderer: &dyn PageRenderer,
    options: &FusionOptions,
) -> Result<usize> {
    let regions = page.layout_regions(&IMAGE_LABELS);
    let mut extracted = 0;

    for region in regions {
        let image = renderer.render_region(page, &region.bbox, options.image_dpi)?;
        let filename = image_filename(page.pnum, page.images.len(), image.extension());
        let span = image_span(&filename, region.bbox);

        let matches: Vec<_> = match_lines(page, &region.bbox, options.bbox_intersection_thresh)
            .into_iter()
            .filter(|&(bi, li)| !holds_image(&page.blocks[bi].lines[li]))
            .collect();
        for &(bi, li) in &matches {
            page.blocks[bi].lines[li].spans.clear();
        }

        let target = matches
            .first()
            .copied()
            .or_else(|| find_insert_block(&page.blocks, &region.bbox).map(|bi| (bi, 0)));

        match target {
            Some((bi, li)) => {
                let block = &mut page.blocks[bi];
                match block.lines.get_mut(li) {
                    Some(line) => line.spans.push(span),
                    None => block.lines.push(Line::new(vec![span])),
                }
            }
            None => {
                let block = Block::new(BlockType::Figure, vec![Line::new(vec![span])], page.pnum);
                page.add_block(block);
            }
        }

        page.images.push(image.with_filename(filename));
        extracted += 1;
    }

    page.prune_empty();
    Ok(extracted)
}

/// Replace every figure region with an image reference and keep its snapshot.
///
/// Snapshots land in `page.images` in region order. Returns how many were extracted.
pub fn extract_images(doc: &mut Document, models: &ModelSet, options: &FusionOptions) -> Result<usize> {
    if !options.extract_images {
        return Ok(0);
    }
    let Some(renderer) = &models.renderer else {
        log::warn!("Image extraction skipped: no page renderer");
        return Ok(0);
    };

    let mut total = 0;
    for page in &mut doc.pages {
        total += extract_page_images(page, renderer.as_ref(), options)?;
    }
    log::info!("Extracted {} images", total);
    Ok(total)
}

/// Collect every page's snapshots keyed by filename.
pub fn images_to_map(pages: &[Page]) -> BTreeMap<String, Resource> {
    let mut images = BTreeMap::new();
    for page in pages {
        for (idx, image) in page.images.iter().enumerate() {
            let name = image.suggested_filename(&format!("{}_image_{}", page.pnum, idx));
            images.insert(name, image.clone());
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layout, LayoutRegion};
    use std::sync::Arc;

    struct PngRenderer;

    impl PageRenderer for PngRenderer {
        fn render_page(&self, _page: &Page, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![]))
        }

        fn render_region(&self, _page: &Page, _bbox: &BBox, _dpi: u32) -> Result<Resource> {
            Ok(Resource::png(vec![0x89]))
        }
    }

    fn doc_with_figures(regions: &[BBox]) -> Document {
        let mut page = Page::letter(2);
        let lines = [("caption text", 100.0), ("figure label", 300.0), ("body", 500.0)]
            .iter()
            .map(|(t, y)| Line::new(vec![Span::new(*t, BBox::new(50.0, *y, 400.0, y + 12.0))]))
            .collect();
        page.add_block(Block::new(BlockType::Text, lines, 2));
        page.layout = Some(Layout {
            image_bbox: page.bbox,
            bboxes: regions
                .iter()
                .map(|bbox| LayoutRegion { bbox: *bbox, label: RegionLabel::Picture })
                .collect(),
        });
        let mut doc = Document::new("figs");
        doc.add_page(page);
        doc
    }

    fn models() -> ModelSet {
        ModelSet::new().with_renderer(Arc::new(PngRenderer))
    }

    #[test]
    fn test_matched_line_replaced_by_reference() {
        let mut doc = doc_with_figures(&[BBox::new(40.0, 250.0, 420.0, 320.0)]);
        assert_eq!(extract_images(&mut doc, &models(), &FusionOptions::default()).unwrap(), 1);

        let page = &doc.pages[0];
        let texts: Vec<String> = page.lines().map(|l| l.prelim_text()).collect();
        assert_eq!(
            texts,
            vec![
                "caption text".to_string(),
                "\n\n![2_image_0.png](2_image_0.png)\n\n".to_string(),
                "body".to_string(),
            ]
        );
        assert_eq!(page.images[0].filename.as_deref(), Some("2_image_0.png"));
        assert!(page.blocks[0].lines[1].spans[0].image);
    }

    #[test]
    fn test_unmatched_region_goes_to_nearest_block() {
        let mut doc = doc_with_figures(&[BBox::new(40.0, 600.0, 420.0, 700.0)]);
        extract_images(&mut doc, &models(), &FusionOptions::default()).unwrap();
        let first_line = &doc.pages[0].blocks[0].lines[0];
        assert_eq!(first_line.spans.len(), 2);
        assert!(first_line.spans[1].image);
    }

    #[test]
    fn test_empty_page_gets_figure_block() {
        let mut doc = doc_with_figures(&[BBox::new(40.0, 600.0, 420.0, 700.0)]);
        doc.pages[0].blocks.clear();
        extract_images(&mut doc, &models(), &FusionOptions::default()).unwrap();
        assert_eq!(doc.pages[0].blocks.len(), 1);
        assert_eq!(doc.pages[0].blocks[0].block_type, BlockType::Figure);
    }

    #[test]
    fn test_images_map_and_sequential_names() {
        let mut doc = doc_with_figures(&[
            BBox::new(40.0, 250.0, 420.0, 320.0),
            BBox::new(40.0, 600.0, 420.0, 700.0),
        ]);
        extract_images(&mut doc, &models(), &FusionOptions::default()).unwrap();
        let map = images_to_map(&doc.pages);
        let names: Vec<&String> = map.keys().collect();
        assert_eq!(names, vec!["2_image_0.png", "2_image_1.png"]);
    }

    #[test]
    fn test_disabled_or_no_renderer() {
        let mut doc = doc_with_figures(&[BBox::new(40.0, 250.0, 420.0, 320.0)]);
        let off = FusionOptions::default().with_images(false);
        assert_eq!(extract_images(&mut doc, &models(), &off).unwrap(), 0);
        assert_eq!(extract_images(&mut doc, &ModelSet::new(), &FusionOptions::default()).unwrap(), 0);
        assert!(doc.pages[0].images.is_empty());
    }
}
