//! Batch driver: curate every requested category of a store.
//!
//! The store is read once up front and the snapshot written once at the
//! end. File-level problems abort before anything is written; problems
//! with a single category fall back to that category's existing set.
use crate::candidates::CandidateSupplier;
use crate::curator::curate;
use crate::error::{CurateError, Result};
use crate::history::{append_history, HistoryEntry, HISTORY_SCHEMA_VERSION};
use crate::report::build_report;
use crate::store::{load_store, stage_sidecar, stage_snapshot, DescriptionStore};
use crate::types::{Category, CurationResult, DescriptionSet};
use crate::util::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What a batch run does with the supplier's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Snapshot raw candidates without curation.
    Generation,
    /// Reconcile candidates against the store and curate.
    Validation,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Generation => "generation",
            Mode::Validation => "validation",
        }
    }

    fn snapshot_prefix(&self) -> &'static str {
        match self {
            Mode::Generation => "candidates",
            Mode::Validation => "curated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryStatus {
    Curated { dropped: usize },
    Generated { count: usize },
    /// The existing set was kept unchanged.
    Fallback { reason: String },
    /// Generation mode only: the category was left out of the snapshot.
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub categories_processed: usize,
    pub succeeded: usize,
    pub fallback: usize,
    pub failed: usize,
    pub total_original: usize,
    pub total_selected: usize,
    pub statuses: BTreeMap<Category, CategoryStatus>,
}

impl BatchSummary {
    fn record(&mut self, category: &str, original: usize, selected: usize, status: CategoryStatus) {
        self.categories_processed += 1;
        self.total_original += original;
        self.total_selected += selected;
        match status {
            CategoryStatus::Curated { .. } | CategoryStatus::Generated { .. } => {
                self.succeeded += 1
            }
            CategoryStatus::Fallback { .. } => self.fallback += 1,
            CategoryStatus::Failed { .. } => self.failed += 1,
        }
        self.statuses.insert(category.to_string(), status);
    }
}

/// In-memory result of processing categories, before anything is persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRun {
    pub results: BTreeMap<Category, CurationResult>,
    pub summary: BatchSummary,
}

impl BatchRun {
    /// Store-shaped view of the selected descriptions.
    pub fn selected_store(&self) -> BTreeMap<&str, &DescriptionSet> {
        self.results
            .iter()
            .map(|(category, result)| (category.as_str(), &result.selected))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub mode: Mode,
    pub threshold: f64,
    pub out_dir: PathBuf,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub run: BatchRun,
    /// Canonical output directory the files below live in.
    pub out_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Resolve the categories to process. No request means every stored key.
///
/// Any unknown category fails the whole request before work starts.
pub fn select_categories(store: &DescriptionStore, requested: &[String]) -> Result<Vec<Category>> {
    if requested.is_empty() {
        return Ok(store.keys().cloned().collect());
    }
    let mut selected = Vec::with_capacity(requested.len());
    for category in requested {
        if !store.contains_key(category) {
            return Err(CurateError::CategoryNotFound {
                category: category.clone(),
                available: store.keys().cloned().collect(),
            });
        }
        if !selected.contains(category) {
            selected.push(category.clone());
        }
    }
    Ok(selected)
}

/// Fetch candidates for one category and curate them against `existing`.
pub fn curate_category(
    category: &str,
    existing: &[String],
    supplier: &mut dyn CandidateSupplier,
    threshold: f64,
) -> Result<CurationResult> {
    let candidate = supplier.candidates(category, existing)?;
    let report = build_report(category, existing, &candidate, threshold);
    for note in &report.notes {
        tracing::debug!(category, note = note.as_str(), "validation note");
    }
    curate(category, existing, &candidate, &report)
}

/// Process `categories` of `store` without touching the filesystem.
///
/// Errors that are not category-level abort the run.
pub fn process_categories(
    store: &DescriptionStore,
    categories: &[Category],
    supplier: &mut dyn CandidateSupplier,
    mode: Mode,
    threshold: f64,
) -> Result<BatchRun> {
    let mut run = BatchRun::default();
    for category in categories {
        let existing = store
            .get(category)
            .ok_or_else(|| CurateError::CategoryNotFound {
                category: category.clone(),
                available: store.keys().cloned().collect(),
            })?;
        let start = Instant::now();
        match mode {
            Mode::Validation => {
                process_validation(&mut run, category, existing, supplier, threshold)?
            }
            Mode::Generation => process_generation(&mut run, category, existing, supplier)?,
        }
        tracing::debug!(
            category = category.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "category processed"
        );
    }
    Ok(run)
}

fn process_validation(
    run: &mut BatchRun,
    category: &str,
    existing: &DescriptionSet,
    supplier: &mut dyn CandidateSupplier,
    threshold: f64,
) -> Result<()> {
    let curated = curate_category(category, existing, supplier, threshold);
    record_validation(run, category, existing, curated)
}

/// Record one category's curation outcome, falling back to `existing` on
/// category-level errors.
fn record_validation(
    run: &mut BatchRun,
    category: &str,
    existing: &DescriptionSet,
    curated: Result<CurationResult>,
) -> Result<()> {
    let (result, status) = match curated {
        Ok(result) => {
            tracing::info!(
                category,
                existing = existing.len(),
                selected = result.selected.len(),
                dropped = result.dropped_count,
                "category curated"
            );
            let status = CategoryStatus::Curated {
                dropped: result.dropped_count,
            };
            (result, status)
        }
        Err(err) if err.is_category_level() => {
            tracing::warn!(category, error = %err, "falling back to existing descriptions");
            let result = CurationResult {
                category: category.to_string(),
                selected: existing.clone(),
                dropped_count: 0,
            };
            (result, CategoryStatus::Fallback { reason: err.to_string() })
        }
        Err(err) => return Err(err),
    };
    run.summary
        .record(category, existing.len(), result.selected.len(), status);
    run.results.insert(category.to_string(), result);
    Ok(())
}

fn process_generation(
    run: &mut BatchRun,
    category: &str,
    existing: &DescriptionSet,
    supplier: &mut dyn CandidateSupplier,
) -> Result<()> {
    match supplier.candidates(category, existing) {
        Ok(candidate) => {
            tracing::info!(category, generated = candidate.len(), "candidates generated");
            let status = CategoryStatus::Generated {
                count: candidate.len(),
            };
            run.summary
                .record(category, existing.len(), candidate.len(), status);
            run.results.insert(
                category.to_string(),
                CurationResult {
                    category: category.to_string(),
                    selected: candidate,
                    dropped_count: 0,
                },
            );
        }
        Err(err) if err.is_category_level() => {
            tracing::warn!(category, error = %err, "candidate generation failed");
            run.summary.record(
                category,
                existing.len(),
                0,
                CategoryStatus::Failed {
                    reason: err.to_string(),
                },
            );
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

/// Load `store_path`, process the requested categories, and persist a new
/// snapshot plus its summary. The store file itself is never written.
pub fn run_batch(
    store_path: &Path,
    requested: &[String],
    supplier: &mut dyn CandidateSupplier,
    options: &BatchOptions,
) -> Result<BatchOutcome> {
    let started_at_epoch_ms = now_epoch_ms();
    let store = load_store(store_path)?;
    let categories = select_categories(&store, requested)?;
    tracing::info!(
        store = %store_path.display(),
        categories = categories.len(),
        mode = options.mode.as_str(),
        "batch start"
    );

    let run = process_categories(&store, &categories, supplier, options.mode, options.threshold)?;

    fs::create_dir_all(&options.out_dir).map_err(|err| CurateError::io(&options.out_dir, err))?;
    let out_dir =
        fs::canonicalize(&options.out_dir).map_err(|err| CurateError::io(&options.out_dir, err))?;

    // Both files stay staged until everything else has succeeded.
    let snapshot = stage_snapshot(
        &out_dir,
        options.mode.snapshot_prefix(),
        &run.selected_store(),
    )?;
    let summary_file = stage_sidecar(&snapshot, "summary", &run.summary)?;

    let snapshot_path = snapshot.publish()?;
    let summary_path = match summary_file.publish() {
        Ok(path) => path,
        Err(err) => {
            discard(&[snapshot_path.as_path()]);
            return Err(err);
        }
    };

    let summary = &run.summary;
    let entry = HistoryEntry {
        schema_version: HISTORY_SCHEMA_VERSION,
        started_at_epoch_ms,
        finished_at_epoch_ms: now_epoch_ms(),
        mode: options.mode.as_str().to_string(),
        store_path: store_path.to_path_buf(),
        snapshot_path: snapshot_path.clone(),
        categories_processed: summary.categories_processed,
        fallback: summary.fallback,
        total_original: summary.total_original,
        total_selected: summary.total_selected,
    };
    if let Err(err) = append_history(&out_dir, &entry) {
        discard(&[snapshot_path.as_path(), summary_path.as_path()]);
        return Err(err);
    }
    tracing::info!(
        snapshot = %snapshot_path.display(),
        processed = summary.categories_processed,
        fallback = summary.fallback,
        total_original = summary.total_original,
        total_selected = summary.total_selected,
        "batch complete"
    );

    Ok(BatchOutcome {
        run,
        out_dir,
        snapshot_path,
        summary_path,
    })
}

/// Remove already published outputs of a run that failed afterwards.
fn discard(paths: &[&Path]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove output");
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
