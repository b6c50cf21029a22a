//! Debug dumps written next to the conversion output when `debug_level` is set.

use crate::error::Result;
use crate::model::{BBox, BlockType, Document, RegionLabel, Resource};
use crate::options::FusionOptions;
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct EquationRecord<'a> {
    image: String,
    text: &'a str,
    bbox: BBox,
}

#[derive(Serialize)]
struct LineRecord {
    bbox: BBox,
    text: String,
}

#[derive(Serialize)]
struct BlockRecord {
    block_type: BlockType,
    bbox: BBox,
    lines: Vec<LineRecord>,
}

#[derive(Serialize)]
struct RegionRecord {
    bbox: BBox,
    label: RegionLabel,
}

#[derive(Serialize)]
struct PageRecord {
    pnum: usize,
    bbox: BBox,
    blocks: Vec<BlockRecord>,
    layout: Vec<RegionRecord>,
}

fn debug_folder(options: &FusionOptions, min_level: u8) -> Option<&PathBuf> {
    if options.debug_level < min_level {
        return None;
    }
    options.debug_data_folder.as_ref()
}

/// Write `<doc>_equations.json` with each rendered equation, its prediction and bbox.
///
/// # Panics
///
/// When `images`, `converted` and `bboxes` differ in length. Callers pair them
/// one-to-one, so a mismatch is a bug upstream.
pub fn dump_equation_debug_data(
    doc_name: &str,
    images: &[Resource],
    converted: &[String],
    bboxes: &[BBox],
    options: &FusionOptions,
) -> Result<Option<PathBuf>> {
    let Some(folder) = debug_folder(options, 1) else {
        return Ok(None);
    };
    assert_eq!(
        images.len(),
        converted.len(),
        "equation images and predictions are not paired"
    );
    assert_eq!(images.len(), bboxes.len(), "equation images and bboxes are not paired");

    let records: Vec<EquationRecord> = images
        .iter()
        .zip(converted)
        .zip(bboxes)
        .map(|((image, text), bbox)| EquationRecord {
            image: general_purpose::STANDARD.encode(&image.data),
            text,
            bbox: *bbox,
        })
        .collect();

    fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}_equations.json", doc_name));
    fs::write(&path, serde_json::to_string_pretty(&records)?)?;
    log::debug!("Wrote {} equations to {}", records.len(), path.display());
    Ok(Some(path))
}

/// Write `<doc>_bbox.json` with every page's blocks, lines and layout regions.
///
/// Only at debug level 2 and above.
pub fn dump_bbox_debug_data(doc: &Document, options: &FusionOptions) -> Result<Option<PathBuf>> {
    let Some(folder) = debug_folder(options, 2) else {
        return Ok(None);
    };

    let pages: Vec<PageRecord> = doc
        .pages
        .iter()
        .map(|page| PageRecord {
            pnum: page.pnum,
            bbox: page.bbox,
            blocks: page
                .blocks
                .iter()
                .map(|block| BlockRecord {
                    block_type: block.block_type,
                    bbox: block.bbox,
                    lines: block
                        .lines
                        .iter()
                        .map(|line| LineRecord {
                            bbox: line.bbox,
                            text: line.prelim_text(),
                        })
                        .collect(),
                })
                .collect(),
            layout: page
                .layout
                .as_ref()
                .map(|layout| {
                    layout
                        .bboxes
                        .iter()
                        .map(|r| RegionRecord {
                            bbox: r.bbox.rescale(&layout.image_bbox, &page.bbox),
                            label: r.label,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}_bbox.json", doc.name));
    fs::write(&path, serde_json::to_string_pretty(&pages)?)?;
    Ok(Some(path))
}
