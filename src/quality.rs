//! Comparative quality metrics for description sets.
use crate::text::count_words;
use crate::types::QualityMetrics;

pub const TECHNICAL_TERMS: [&str; 5] = ["tumor", "carcinoma", "neoplasm", "malignant", "morphology"];
pub const ADVANCED_MEDICAL_TERMS: [&str; 4] = [
    "histologic",
    "pathologic",
    "microscopic",
    "immunohistochemical",
];

/// Metrics for the existing and candidate sets, computed independently.
pub fn assess(existing: &[String], candidate: &[String]) -> (QualityMetrics, QualityMetrics) {
    (metrics(existing), metrics(candidate))
}

/// Metrics for a single set. An empty set reports zeros.
pub fn metrics(descriptions: &[String]) -> QualityMetrics {
    if descriptions.is_empty() {
        return QualityMetrics::default();
    }
    let total_words: usize = descriptions.iter().map(|d| count_words(d)).sum();
    QualityMetrics {
        description_count: descriptions.len(),
        avg_word_count: total_words as f64 / descriptions.len() as f64,
        technical_term_count: count_containing(descriptions, &TECHNICAL_TERMS),
        advanced_term_count: count_containing(descriptions, &ADVANCED_MEDICAL_TERMS),
    }
}

/// Number of descriptions containing at least one of `terms` as a
/// case-insensitive substring.
fn count_containing(descriptions: &[String], terms: &[&str]) -> usize {
    descriptions
        .iter()
        .filter(|d| {
            let lowered = d.to_lowercase();
            terms.iter().any(|term| lowered.contains(term))
        })
        .count()
}
