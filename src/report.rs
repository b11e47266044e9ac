//! Validation reports: reconciliation + quality findings with ordered notes.
//!
//! Notes are derived by a fixed policy so identical inputs always produce
//! identical reports:
//!
//! 1. description counts (more comprehensive side, or parity)
//! 2. advanced medical terminology (omitted when equal)
use crate::quality::assess;
use crate::reconcile::reconcile;
use crate::types::{QualityMetrics, ValidationReport};
use std::fmt::Write as _;

/// Reconcile and assess both sets for `category` and derive the notes.
pub fn build_report(
    category: &str,
    existing: &[String],
    candidate: &[String],
    threshold: f64,
) -> ValidationReport {
    let reconciliation = reconcile(existing, candidate, threshold);
    let (existing_metrics, candidate_metrics) = assess(existing, candidate);
    let notes = derive_notes(
        existing.len(),
        candidate.len(),
        &existing_metrics,
        &candidate_metrics,
    );
    ValidationReport {
        category: category.to_string(),
        existing: existing.to_vec(),
        candidate: candidate.to_vec(),
        threshold,
        overlaps: reconciliation.overlaps,
        unique_to_existing: reconciliation.unique_to_existing,
        unique_to_candidate: reconciliation.unique_to_candidate,
        existing_metrics,
        candidate_metrics,
        notes,
    }
}

fn derive_notes(
    existing_len: usize,
    candidate_len: usize,
    existing_metrics: &QualityMetrics,
    candidate_metrics: &QualityMetrics,
) -> Vec<String> {
    let mut notes = Vec::new();

    let count_note = if candidate_len > existing_len {
        format!(
            "Candidate set is more comprehensive ({candidate_len} vs {existing_len} descriptions)"
        )
    } else if candidate_len < existing_len {
        format!(
            "Existing set is more comprehensive ({existing_len} vs {candidate_len} descriptions)"
        )
    } else {
        format!("Both sets contain {existing_len} descriptions")
    };
    notes.push(count_note);

    let existing_adv = existing_metrics.advanced_term_count;
    let candidate_adv = candidate_metrics.advanced_term_count;
    if candidate_adv > existing_adv {
        notes.push(format!(
            "Candidate set uses more advanced medical terminology ({candidate_adv} vs {existing_adv})"
        ));
    } else if existing_adv > candidate_adv {
        notes.push(format!(
            "Existing set uses more advanced medical terminology ({existing_adv} vs {candidate_adv})"
        ));
    }

    notes
}

/// Render a report as a human-readable markdown document.
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Validation report: {}", report.category);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Similarity threshold: {:.2}", report.threshold);
    let _ = writeln!(out, "- Existing descriptions: {}", report.existing.len());
    let _ = writeln!(out, "- Candidate descriptions: {}", report.candidate.len());
    let _ = writeln!(out, "- Overlapping pairs: {}", report.overlaps.len());

    let _ = writeln!(out);
    let _ = writeln!(out, "## Overlaps");
    let _ = writeln!(out);
    if report.overlaps.is_empty() {
        let _ = writeln!(out, "None.");
    } else {
        let _ = writeln!(out, "| Score | Existing | Candidate |");
        let _ = writeln!(out, "|---|---|---|");
        for pair in &report.overlaps {
            let _ = writeln!(
                out,
                "| {:.2} | {} | {} |",
                pair.score,
                escape_cell(&pair.existing),
                escape_cell(&pair.candidate)
            );
        }
    }

    render_list(&mut out, "Unique to existing", &report.unique_to_existing);
    render_list(&mut out, "Unique to candidate", &report.unique_to_candidate);

    let _ = writeln!(out);
    let _ = writeln!(out, "## Quality");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Existing | Candidate |");
    let _ = writeln!(out, "|---|---|---|");
    let e = &report.existing_metrics;
    let c = &report.candidate_metrics;
    let _ = writeln!(
        out,
        "| Average words | {:.1} | {:.1} |",
        e.avg_word_count, c.avg_word_count
    );
    let _ = writeln!(
        out,
        "| With technical terms | {} | {} |",
        e.technical_term_count, c.technical_term_count
    );
    let _ = writeln!(
        out,
        "| With advanced medical terms | {} | {} |",
        e.advanced_term_count, c.advanced_term_count
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "## Notes");
    let _ = writeln!(out);
    for note in &report.notes {
        let _ = writeln!(out, "- {note}");
    }
    out
}

fn render_list(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out);
    let _ = writeln!(out, "## {title}");
    let _ = writeln!(out);
    if items.is_empty() {
        let _ = writeln!(out, "None.");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {}", item.trim());
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
