//! Bold and italic detection from font names and weights.

use crate::model::Document;
use crate::options::FusionOptions;

/// Mark spans bold or italic.
///
/// Font names containing "bold" or "ital" set the flags directly. When any
/// body font weights are known, spans at or above `bold_min_weight` are bold
/// too. Headings are left out of the weight sample so they do not skew it.
pub fn find_bold_italic(doc: &mut Document, options: &FusionOptions) {
    let mut weights_seen = 0usize;

    for block in doc.pages.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
        if block.block_type.is_heading() {
            continue;
        }
        for span in block.lines.iter_mut().flat_map(|l| l.spans.iter_mut()) {
            let font = span.font.to_lowercase();
            if font.contains("bold") {
                span.bold = true;
            }
            if font.contains("ital") {
                span.italic = true;
            }
            weights_seen += 1;
        }
    }

    if weights_seen == 0 {
        return;
    }

    for span in doc
        .pages
        .iter_mut()
        .flat_map(|p| p.blocks.iter_mut())
        .flat_map(|b| b.lines.iter_mut())
        .flat_map(|l| l.spans.iter_mut())
    {
        if span.font_weight >= options.bold_min_weight {
            span.bold = true;
        }
    }
}
