//! Data types shared by the curation engine.
//!
//! Everything here is created fresh per category and never mutated after
//! construction; the batch driver serializes the results and drops them.
use serde::{Deserialize, Serialize};

/// Label a description set is scoped to (e.g. a tumor subtype).
pub type Category = String;

/// Ordered descriptions for one category, in insertion order.
pub type DescriptionSet = Vec<String>;

/// Which input a description came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Existing,
    Candidate,
}

/// An existing/candidate pair whose similarity reached the threshold.
///
/// Indices point back into the input sets so the curator can dedup by
/// source position rather than by content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlapPair {
    pub existing_index: usize,
    pub candidate_index: usize,
    pub existing: String,
    pub candidate: String,
    pub score: f64,
}

/// Output of reconciling two description sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reconciliation {
    pub overlaps: Vec<OverlapPair>,
    pub unique_to_existing: DescriptionSet,
    pub unique_to_candidate: DescriptionSet,
}

/// Per-set quality numbers used for comparison notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    pub description_count: usize,
    pub avg_word_count: f64,
    pub technical_term_count: usize,
    pub advanced_term_count: usize,
}

/// Combined reconciliation and quality findings for one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub category: Category,
    pub existing: DescriptionSet,
    pub candidate: DescriptionSet,
    pub threshold: f64,
    pub overlaps: Vec<OverlapPair>,
    pub unique_to_existing: DescriptionSet,
    pub unique_to_candidate: DescriptionSet,
    pub existing_metrics: QualityMetrics,
    pub candidate_metrics: QualityMetrics,
    pub notes: Vec<String>,
}

/// Final selection for one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurationResult {
    pub category: Category,
    pub selected: DescriptionSet,
    pub dropped_count: usize,
}
