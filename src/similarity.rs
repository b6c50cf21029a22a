//! Fuzzy string similarity shared by the title filter and the benchmark scorer.

/// Similarity of two strings on a 0–100 scale.
///
/// Normalized Levenshtein over chars; two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Similarity of two strings on a 0–1 scale.
pub fn normalized_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
