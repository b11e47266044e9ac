//! Lexical normalization and similarity.
//!
//! Descriptions are compared as bags of lower-cased, whitespace-separated
//! tokens. Punctuation stays attached to its word.
use std::collections::BTreeSet;

/// Lower-case `text` and collect its whitespace-separated tokens.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard index of the two token sets, in `[0.0, 1.0]`.
///
/// Two descriptions with no tokens at all score 0. Batch code tokenizes each
/// description once and calls [`token_similarity`] directly.
#[cfg_attr(not(test), allow(dead_code))]
pub fn similarity(a: &str, b: &str) -> f64 {
    token_similarity(&tokenize(a), &tokenize(b))
}

pub(crate) fn token_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
