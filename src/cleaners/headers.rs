//! Running header/footer removal and duplicate-title suppression.

use crate::model::{BlockId, Document, Line, SpanId};
use crate::options::FusionOptions;
use crate::similarity::normalized_ratio;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static LEADING_HASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#+").expect("Invalid heading marker regex"));
static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+").expect("Invalid leading digits regex"));
static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+$").expect("Invalid trailing digits regex"));

/// Span ids whose text repeats across more than `ratio` of the pages.
///
/// `groups` holds one slice of candidate lines per page.
fn common_span_ids(groups: &[Vec<&Line>], page_count: usize, options: &FusionOptions) -> Vec<SpanId> {
    let mut pages_with_text: HashMap<&str, usize> = HashMap::new();
    for lines in groups {
        let texts: HashSet<&str> = lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .map(|s| s.text.as_str())
            .filter(|t| t.chars().count() > options.header_min_chars)
            .collect();
        for text in texts {
            *pages_with_text.entry(text).or_insert(0) += 1;
        }
    }

    let limit = page_count as f32 * options.header_footer_ratio;
    let common: HashSet<&str> = pages_with_text
        .into_iter()
        .filter(|(_, count)| *count as f32 > limit)
        .map(|(text, _)| text)
        .collect();

    groups
        .iter()
        .flatten()
        .flat_map(|l| l.spans.iter())
        .filter(|s| common.contains(s.text.as_str()))
        .map(|s| s.id)
        .collect()
}

/// Find spans of running headers and footers.
///
/// Looks at the first and last `header_footer_lines` non-blank lines of every
/// page. Documents with fewer than three pages are left alone.
pub fn filter_header_footer(doc: &Document, options: &FusionOptions) -> HashSet<SpanId> {
    let page_count = doc.page_count();
    if page_count < 3 {
        return HashSet::new();
    }

    let k = options.header_footer_lines;
    let mut first_lines = Vec::with_capacity(page_count);
    let mut last_lines = Vec::with_capacity(page_count);
    for page in &doc.pages {
        let nonblank: Vec<&Line> = page.lines().filter(|l| !l.is_blank()).collect();
        let take = k.min(nonblank.len());
        first_lines.push(nonblank[..take].to_vec());
        last_lines.push(nonblank[nonblank.len() - take..].to_vec());
    }

    let mut bad = common_span_ids(&first_lines, page_count, options);
    bad.extend(common_span_ids(&last_lines, page_count, options));
    bad.into_iter().collect()
}

/// Remove the given spans and prune what becomes empty. Returns spans removed.
pub fn remove_spans(doc: &mut Document, ids: &HashSet<SpanId>) -> usize {
    if ids.is_empty() {
        return 0;
    }
    let mut removed = 0;
    for page in &mut doc.pages {
        removed += page.remove_spans(ids);
        page.prune_empty();
    }
    removed
}

/// Normalize heading text for comparison: markdown markers, page numbers and
/// surrounding whitespace are stripped.
pub fn normalize_title(text: &str) -> String {
    let text = text.trim();
    let text = LEADING_HASHES.replace(text, "");
    let text = text.trim();
    let text = LEADING_DIGITS.replace(text, "");
    let text = TRAILING_DIGITS.replace(&text, "");
    text.trim().to_string()
}

/// Find heading blocks that repeat like running headers.
pub fn find_common_titles(doc: &Document, options: &FusionOptions) -> HashSet<BlockId> {
    let titles: Vec<(BlockId, String)> = doc
        .blocks()
        .filter(|b| b.block_type.is_heading())
        .map(|b| (b.id, normalize_title(&b.prelim_text())))
        .collect();

    let needed = (options.title_min_count as f32).max(titles.len() as f32 * options.title_min_fraction);
    let threshold = options.title_similarity as f64;

    let mut bad = HashSet::new();
    for (i, (id, title)) in titles.iter().enumerate() {
        let overlaps = titles
            .iter()
            .enumerate()
            .filter(|(j, (_, other))| *j != i && normalized_ratio(title, other) >= threshold)
            .count();
        if overlaps as f32 >= needed {
            bad.insert(*id);
        }
    }
    bad
}

/// Drop repeating heading blocks from the document. Returns blocks dropped.
pub fn filter_common_titles(doc: &mut Document, options: &FusionOptions) -> usize {
    let bad = find_common_titles(doc, options);
    if bad.is_empty() {
        return 0;
    }
    let mut dropped = 0;
    for page in &mut doc.pages {
        let before = page.blocks.len();
        page.blocks.retain(|b| !bad.contains(&b.id));
        dropped += before - page.blocks.len();
    }
    log::debug!("Dropped {} repeating titles", dropped);
    dropped
}
