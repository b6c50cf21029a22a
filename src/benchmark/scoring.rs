//! Windowed fuzzy alignment of hypothesis text against a reference.

use crate::similarity::ratio;

/// Characters per chunk.
pub const CHUNK_LEN: usize = 500;

/// Chunks this short or shorter (after trimming) are ignored.
pub const CHUNK_MIN_CHARS: usize = 25;

/// Pair scores at or below this (0–100) count as no match.
pub const SCORE_CUTOFF: f64 = 30.0;

/// Split `text` into `chunk_len`-character chunks, keeping the substantial ones trimmed.
pub fn chunk_text(text: &str, chunk_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_len.max(1))
        .map(|chunk| chunk.iter().collect::<String>().trim().to_string())
        .filter(|chunk| chunk.chars().count() > CHUNK_MIN_CHARS)
        .collect()
}

/// Best match score (0–1) of every hypothesis chunk.
///
/// Chunk `i` is only compared with reference chunks near its proportional
/// position, within `max(|ref| / 5, 10)` chunks either side.
pub fn overlap_score(hypothesis: &[String], reference: &[String]) -> Vec<f64> {
    if reference.is_empty() {
        return vec![0.0; hypothesis.len()];
    }
    let length_modifier = hypothesis.len() as f64 / reference.len() as f64;
    let search_distance = (reference.len() / 5).max(10);

    hypothesis
        .iter()
        .enumerate()
        .map(|(i, hyp_chunk)| {
            let offset = (i as f64 * length_modifier) as usize;
            let start = offset.saturating_sub(search_distance);
            let end = (offset + search_distance).min(reference.len());

            reference
                .get(start..end)
                .unwrap_or_default()
                .iter()
                .map(|ref_chunk| ratio(hyp_chunk, ref_chunk))
                .filter(|score| *score > SCORE_CUTOFF)
                .map(|score| score / 100.0)
                .fold(0.0, f64::max)
        })
        .collect()
}

/// Alignment score of `hypothesis` against `reference` in [0, 1].
///
/// A hypothesis with no substantial chunks scores 0.
pub fn score_text(hypothesis: &str, reference: &str) -> f64 {
    let hypothesis = chunk_text(hypothesis, CHUNK_LEN);
    let reference = chunk_text(reference, CHUNK_LEN);
    let scores = overlap_score(&hypothesis, &reference);
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(paragraphs: usize) -> String {
        (0..paragraphs)
            .map(|i| {
                format!(
                    "Paragraph {} discusses layout fusion, reading order and how extracted spans are merged into blocks. ",
                    i
                )
            })
            .collect()
    }

    #[test]
    fn test_chunk_text_drops_short_tail() {
        let text = format!("{}{}", "a".repeat(500), "  short tail  ");
        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 500);
    }

    #[test]
    fn test_chunk_text_counts_chars() {
        let text = "é".repeat(30);
        let chunks = chunk_text(&text, 10);
        // 10-char chunks never exceed the minimum
        assert!(chunks.is_empty());
        assert_eq!(chunk_text(&text, 500).len(), 1);
    }

    #[test]
    fn test_identical_scores_one() {
        let text = sample(40);
        let score = score_text(&text, &text);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_hypothesis_scores_zero() {
        assert_eq!(score_text("", &sample(10)), 0.0);
        assert_eq!(score_text("", ""), 0.0);
    }

    #[test]
    fn test_empty_reference_scores_zero() {
        assert_eq!(score_text(&sample(10), ""), 0.0);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let other = "zqjk".repeat(1000);
        let score = score_text(&other, &sample(40));
        assert!(score < 0.3);
    }

    #[test]
    fn test_window_limits_search() {
        let reference: Vec<String> = (0..100).map(|i| format!("chunk number {:03} of the reference text", i)).collect();
        let hypothesis = vec![reference[99].clone()];
        // chunk 0 searches reference[0..20], so the exact copy at 99 is out of reach
        let scores = overlap_score(&hypothesis, &reference);
        assert!(scores[0] < 1.0);
    }
}
