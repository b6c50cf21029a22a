//! Region splicing primitives shared by the heading, equation and image stages.
//!
//! Stages first record where new content belongs as an [`Anchor`] built from
//! stable line and block handles, then edit the page. Anchors are resolved
//! against the page as it is at insertion time, so blocks inserted or split
//! for earlier regions never invalidate the insertion points of later ones.

use crate::model::{BBox, Block, BlockId, LineId, Page};
use std::collections::HashSet;

/// A `(block index, line index)` pair valid for the page state it was computed on.
pub type LinePos = (usize, usize);

/// Insertion point for a spliced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Immediately before this line, splitting its block when needed
    BeforeLine(LineId),
    /// Before the first line of this block
    StartOfBlock(BlockId),
    /// After the last line of this block
    EndOfBlock(BlockId),
    /// At the end of the page
    EndOfPage,
}

/// Every line covered by `region` more than `thresh`, in page order.
pub fn match_lines(page: &Page, region: &BBox, thresh: f32) -> Vec<LinePos> {
    let mut matches = Vec::new();
    for (bi, block) in page.blocks.iter().enumerate() {
        for (li, line) in block.lines.iter().enumerate() {
            if line.intersection_pct(region) > thresh {
                matches.push((bi, li));
            }
        }
    }
    matches
}

/// Index of the block geometrically closest to `region`.
///
/// Distance is the gap between the boxes (zero when they overlap); ties go to
/// the block whose center is closer, then to the earlier block.
pub fn find_insert_block(blocks: &[Block], region: &BBox) -> Option<usize> {
    let (cx, cy) = region.center();
    blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| {
            let gap = block.bbox.vertical_gap(region).hypot(block.bbox.horizontal_gap(region));
            let (bx, by) = block.bbox.center();
            (idx, gap, (bx - cx).hypot(by - cy))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)))
        .map(|(idx, _, _)| idx)
}

/// Anchor for content replacing the lines in `removed`, placed where `first` was.
///
/// The content goes before the first line after `first` in the same block that
/// survives the removal, or after the block when none survives.
pub fn anchor_after_removal(page: &Page, first: LinePos, removed: &HashSet<LineId>) -> Anchor {
    let (bi, li) = first;
    let block = &page.blocks[bi];
    block.lines[li..]
        .iter()
        .find(|l| !removed.contains(&l.id))
        .map(|l| Anchor::BeforeLine(l.id))
        .unwrap_or(Anchor::EndOfBlock(block.id))
}

/// Anchor for a region no line matched: the start of the nearest block.
pub fn fallback_anchor(page: &Page, region: &BBox) -> Anchor {
    match find_insert_block(&page.blocks, region) {
        Some(idx) => Anchor::StartOfBlock(page.blocks[idx].id),
        None => Anchor::EndOfPage,
    }
}

/// Insert `block` at `anchor`. Returns how many blocks the page grew by.
///
/// Anchoring inside a block splits it into `[before, block, after]` (2 added);
/// anchoring at a block edge adds 1. An anchor whose handle no longer exists
/// appends to the page.
pub fn insert_block(page: &mut Page, anchor: Anchor, block: Block) -> usize {
    match anchor {
        Anchor::BeforeLine(id) => match page.locate_line(id) {
            Some((bi, 0)) => {
                page.blocks.insert(bi, block);
                1
            }
            Some((bi, li)) => {
                let after = split_block(&mut page.blocks[bi], li);
                page.blocks.insert(bi + 1, block);
                page.blocks.insert(bi + 2, after);
                2
            }
            None => append(page, block),
        },
        Anchor::StartOfBlock(id) => match page.block_index(id) {
            Some(bi) => {
                page.blocks.insert(bi, block);
                1
            }
            None => append(page, block),
        },
        Anchor::EndOfBlock(id) => match page.block_index(id) {
            Some(bi) => {
                page.blocks.insert(bi + 1, block);
                1
            }
            None => append(page, block),
        },
        Anchor::EndOfPage => append(page, block),
    }
}

fn append(page: &mut Page, block: Block) -> usize {
    page.blocks.push(block);
    1
}

/// Split `block` at `at`, keeping `[..at]` in place and returning `[at..]` as a
/// new block of the same type. Both boxes are recomputed.
pub fn split_block(block: &mut Block, at: usize) -> Block {
    let tail = block.lines.split_off(at);
    block.recompute_bbox();
    Block::new(block.block_type, tail, block.pnum)
}
