//! Reading-order resolution from order-model boxes.

use crate::model::{rescale, Block, Document, Order, Page};
use crate::options::FusionOptions;
use std::collections::BTreeMap;

/// Assign each block the position of the order box covering it most.
///
/// Ties keep the first box encountered. Blocks no box touches get fresh
/// positions past every position seen so far, in their original order.
fn assign_positions(page: &Page, order: &Order) -> Vec<usize> {
    let boxes: Vec<_> = order
        .bboxes
        .iter()
        .map(|b| (rescale(&order.image_bbox, &page.bbox, &b.bbox), b.position))
        .collect();

    let mut next_free = boxes.iter().map(|(_, p)| p + 1).max().unwrap_or(0);
    page.blocks
        .iter()
        .map(|block| {
            let mut best: Option<(f32, usize)> = None;
            for (bbox, position) in &boxes {
                let pct = block.bbox.intersection_pct(bbox);
                if pct > 0.0 && best.map_or(true, |(top, _)| pct > top) {
                    best = Some((pct, *position));
                }
            }
            match best {
                Some((_, position)) => position,
                None => {
                    let position = next_free;
                    next_free += 1;
                    position
                }
            }
        })
        .collect()
}

/// Sort blocks sharing one position top-to-bottom, then left-to-right.
///
/// Tops are bucketed by `tolerance` so blocks on the same visual row sort by x.
pub fn sort_block_group(blocks: &mut [Block], tolerance: f32) {
    let tolerance = if tolerance > 0.0 { tolerance } else { 1.0 };
    let row = |b: &Block| (b.bbox.y0 / tolerance).round() * tolerance;
    blocks.sort_by(|a, b| {
        row(a)
            .total_cmp(&row(b))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}

fn sort_page(page: &mut Page, tolerance: f32) -> bool {
    let Some(order) = page.order.as_ref() else {
        return false;
    };
    let positions = assign_positions(page, order);

    let mut groups: BTreeMap<usize, Vec<Block>> = BTreeMap::new();
    for (block, position) in std::mem::take(&mut page.blocks).into_iter().zip(positions) {
        groups.entry(position).or_default().push(block);
    }
    for mut group in groups.into_values() {
        sort_block_group(&mut group, tolerance);
        page.blocks.extend(group);
    }
    true
}

/// Reorder every page's blocks by the order model's positions.
///
/// Pages without order predictions keep their block order. Returns the number
/// of pages reordered.
pub fn sort_blocks_in_reading_order(doc: &mut Document, options: &FusionOptions) -> usize {
    let sorted = doc
        .pages
        .iter_mut()
        .map(|page| sort_page(page, options.sort_tolerance))
        .filter(|&sorted| sorted)
        .count();
    log::debug!("Reading order applied to {} pages", sorted);
    sorted
}
