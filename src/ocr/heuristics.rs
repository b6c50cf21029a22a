//! Deciding whether a page needs OCR and whether recognized text is usable.

use crate::model::{rescale, Page};
use crate::options::FusionOptions;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("Invalid newline regex"));

/// Share of letters and digits among the non-space, non-newline characters.
///
/// Empty text counts as fully alphanumeric.
pub fn alphanum_ratio(text: &str) -> f32 {
    let stripped: Vec<char> = text.chars().filter(|c| *c != ' ' && *c != '\n').collect();
    if stripped.is_empty() {
        return 1.0;
    }
    let alnum = stripped.iter().filter(|c| c.is_alphanumeric()).count();
    alnum as f32 / stripped.len() as f32
}

/// Ratio of `runs` to `runs + remaining chars`, zero when both are zero.
fn run_ratio(re: &Regex, text: &str) -> f32 {
    let runs = re.find_iter(text).count();
    let remaining = re.replace_all(text, "").chars().count();
    if runs + remaining == 0 {
        return 0.0;
    }
    runs as f32 / (runs + remaining) as f32
}

/// Whether `text` looks like failed or garbled extraction.
pub fn detect_bad_ocr(text: &str, options: &FusionOptions) -> bool {
    if text.is_empty() {
        return true;
    }
    if run_ratio(&WHITESPACE_RUNS, text) > options.ocr_space_threshold {
        return true;
    }
    if run_ratio(&NEWLINE_RUNS, text) > options.ocr_newline_threshold {
        return true;
    }
    if alphanum_ratio(text) < options.ocr_alphanum_threshold {
        return true;
    }
    let len = text.chars().count();
    let invalid = text
        .chars()
        .filter(|c| options.invalid_chars.contains(c))
        .count();
    invalid as f32 > (len as f32 * 0.03).max(6.0)
}

/// Whether the whole document produced no text.
pub fn no_text_found(pages: &[Page]) -> bool {
    pages.iter().all(|p| p.prelim_text().trim().is_empty())
}

/// Fraction of detected text lines covered by extracted lines.
///
/// `None` when the page has no detections to compare against.
pub fn detected_line_coverage(page: &Page, options: &FusionOptions) -> Option<f32> {
    let text_lines = page.text_lines.as_ref()?;
    if text_lines.bboxes.is_empty() {
        return None;
    }
    let found = text_lines
        .bboxes
        .iter()
        .filter(|detected| {
            let detected = rescale(&text_lines.image_bbox, &page.bbox, detected);
            let covered: f32 = page
                .lines()
                .map(|line| detected.intersection_pct(&line.bbox))
                .sum();
            covered > options.ocr_intersect_thresh
        })
        .count();
    Some(found as f32 / text_lines.bboxes.len() as f32)
}

/// Whether a page should be sent to OCR.
///
/// True when the document has no text at all, when the page's own text looks
/// bad, or when too few detected lines were extracted. Otherwise follows
/// `ocr_all_pages`.
pub fn should_ocr_page(page: &Page, no_text: bool, options: &FusionOptions) -> bool {
    if no_text {
        return true;
    }
    let text = page.prelim_text();
    if !text.is_empty() && detect_bad_ocr(&text, options) {
        return true;
    }
    if let Some(coverage) = detected_line_coverage(page, options) {
        if coverage <= options.ocr_detection_thresh {
            return true;
        }
    }
    options.ocr_all_pages
}
