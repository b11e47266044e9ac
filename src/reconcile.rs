//! Partition two description sets into overlaps and per-side unique content.
use crate::text::{token_similarity, tokenize};
use crate::types::{OverlapPair, Reconciliation};
use std::collections::BTreeSet;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Compare every existing description against every candidate.
///
/// A pair overlaps when its similarity is at least `threshold`. A
/// description is unique only if it matched nothing on the other side; one
/// that matched several partners shows up in several pairs. Pairs are
/// emitted in existing-major, candidate-minor order.
pub fn reconcile(existing: &[String], candidate: &[String], threshold: f64) -> Reconciliation {
    let existing_tokens: Vec<BTreeSet<String>> = existing.iter().map(|d| tokenize(d)).collect();
    let candidate_tokens: Vec<BTreeSet<String>> = candidate.iter().map(|d| tokenize(d)).collect();

    let mut overlaps = Vec::new();
    let mut existing_matched = vec![false; existing.len()];
    let mut candidate_matched = vec![false; candidate.len()];

    for (ei, e_tokens) in existing_tokens.iter().enumerate() {
        for (ci, c_tokens) in candidate_tokens.iter().enumerate() {
            let score = token_similarity(e_tokens, c_tokens);
            if score >= threshold {
                existing_matched[ei] = true;
                candidate_matched[ci] = true;
                overlaps.push(OverlapPair {
                    existing_index: ei,
                    candidate_index: ci,
                    existing: existing[ei].clone(),
                    candidate: candidate[ci].clone(),
                    score,
                });
            }
        }
    }

    Reconciliation {
        overlaps,
        unique_to_existing: unmatched(existing, &existing_matched),
        unique_to_candidate: unmatched(candidate, &candidate_matched),
    }
}

fn unmatched(descriptions: &[String], matched: &[bool]) -> Vec<String> {
    descriptions
        .iter()
        .zip(matched)
        .filter(|(_, hit)| !**hit)
        .map(|(d, _)| d.clone())
        .collect()
}
