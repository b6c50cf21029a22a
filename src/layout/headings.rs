//! Splitting heading lines out of text blocks.

use crate::model::{Block, BlockType, Document, LayoutRegion, Page, RegionLabel};
use crate::options::FusionOptions;

const HEADING_LABELS: [RegionLabel; 2] = [RegionLabel::Title, RegionLabel::SectionHeader];

fn heading_type(label: RegionLabel) -> BlockType {
    match label {
        RegionLabel::Title => BlockType::Title,
        _ => BlockType::SectionHeader,
    }
}

/// Split one text block around the lines that fall inside heading regions.
///
/// Returns the fragments in line order: runs of body lines keep the original
/// type, each heading line becomes its own single-line block.
fn split_block(block: Block, regions: &[LayoutRegion], thresh: f32) -> Vec<Block> {
    let labels: Vec<Option<BlockType>> = block
        .lines
        .iter()
        .map(|line| {
            regions
                .iter()
                .find(|r| line.intersection_pct(&r.bbox) > thresh)
                .map(|r| heading_type(r.label))
        })
        .collect();

    if labels.iter().all(Option::is_none) {
        return vec![block];
    }

    let pnum = block.pnum;
    let body_type = block.block_type;
    let mut fragments = Vec::new();
    let mut run = Vec::new();
    for (line, label) in block.lines.into_iter().zip(labels) {
        match label {
            Some(heading) => {
                if !run.is_empty() {
                    fragments.push(Block::new(body_type, std::mem::take(&mut run), pnum));
                }
                fragments.push(Block::new(heading, vec![line], pnum));
            }
            None => run.push(line),
        }
    }
    if !run.is_empty() {
        fragments.push(Block::new(body_type, run, pnum));
    }
    fragments
}

fn split_page(page: &mut Page, thresh: f32) -> usize {
    let regions = page.layout_regions(&HEADING_LABELS);
    if regions.is_empty() {
        return 0;
    }

    let mut headings = 0;
    let blocks = std::mem::take(&mut page.blocks);
    for block in blocks {
        if block.block_type != BlockType::Text {
            page.blocks.push(block);
            continue;
        }
        let fragments = split_block(block, &regions, thresh);
        headings += fragments.iter().filter(|b| b.block_type.is_heading()).count();
        page.blocks.extend(fragments);
    }
    headings
}

/// Split heading lines out of every text block. Returns the number of heading blocks created.
pub fn split_heading_blocks(doc: &mut Document, options: &FusionOptions) -> usize {
    doc.pages
        .iter_mut()
        .map(|page| split_page(page, options.bbox_intersection_thresh))
        .sum()
}
