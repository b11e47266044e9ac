//! Selection policy: turn a validation report into one curated set.
//!
//! The curated set is, in order:
//!
//! 1. every description unique to the existing set (original order)
//! 2. every description unique to the candidate set (original order)
//! 3. one representative per overlap pair, in discovery order
//!
//! The representative is the side with more words; ties keep the existing
//! description. A source description that represents several pairs is
//! emitted once.
use crate::error::{CurateError, Result};
use crate::text::count_words;
use crate::types::{CurationResult, OverlapPair, Side, ValidationReport};
use std::collections::BTreeSet;

pub fn curate(
    category: &str,
    existing: &[String],
    candidate: &[String],
    report: &ValidationReport,
) -> Result<CurationResult> {
    check_report(category, existing, candidate, report)?;

    let mut selected = Vec::with_capacity(existing.len() + candidate.len());
    selected.extend(report.unique_to_existing.iter().cloned());
    selected.extend(report.unique_to_candidate.iter().cloned());

    let mut emitted: BTreeSet<(Side, usize)> = BTreeSet::new();
    for pair in &report.overlaps {
        let (side, index) = representative(pair);
        if emitted.insert((side, index)) {
            let text = match side {
                Side::Existing => &existing[index],
                Side::Candidate => &candidate[index],
            };
            selected.push(text.clone());
        }
    }

    let total = existing.len() + candidate.len();
    let dropped_count = total.checked_sub(selected.len()).ok_or_else(|| {
        CurateError::Curation {
            category: category.to_string(),
            message: format!(
                "selected {} descriptions from {} inputs",
                selected.len(),
                total
            ),
        }
    })?;

    Ok(CurationResult {
        category: category.to_string(),
        selected,
        dropped_count,
    })
}

fn representative(pair: &OverlapPair) -> (Side, usize) {
    if count_words(&pair.candidate) > count_words(&pair.existing) {
        (Side::Candidate, pair.candidate_index)
    } else {
        (Side::Existing, pair.existing_index)
    }
}

/// The report must describe exactly the inputs being curated.
fn check_report(
    category: &str,
    existing: &[String],
    candidate: &[String],
    report: &ValidationReport,
) -> Result<()> {
    let fail = |message: String| CurateError::Curation {
        category: category.to_string(),
        message,
    };
    if report.category != category {
        return Err(fail(format!(
            "report is for category {:?}",
            report.category
        )));
    }
    if report.existing.as_slice() != existing || report.candidate.as_slice() != candidate {
        return Err(fail("report inputs do not match curation inputs".to_string()));
    }
    for pair in &report.overlaps {
        if pair.existing_index >= existing.len() || pair.candidate_index >= candidate.len() {
            return Err(fail(format!(
                "overlap pair ({}, {}) out of range",
                pair.existing_index, pair.candidate_index
            )));
        }
    }
    Ok(())
}
