use super::*;
use crate::candidates::StaticSupplier;
use crate::history::history_path;
use crate::reconcile::DEFAULT_THRESHOLD;
use crate::store::load_store;
use std::fs;

const STORE_JSON: &str = r#"{
  "ccRCC": [
    "Tumor shows clear cytoplasm and nuclear grade 2",
    "Delicate branching vasculature surrounds tumor nests",
    "Hemorrhage is common"
  ],
  "Oncocytoma": [
    "Eosinophilic granular cytoplasm",
    "Central stellate scar"
  ]
}"#;

fn write_store(dir: &Path) -> PathBuf {
    let path = dir.join("store.json");
    fs::write(&path, STORE_JSON).expect("write store");
    path
}

fn options(dir: &Path, mode: Mode) -> BatchOptions {
    BatchOptions {
        mode,
        threshold: DEFAULT_THRESHOLD,
        out_dir: dir.join("out"),
    }
}

fn out_files(dir: &Path) -> Vec<PathBuf> {
    let out = dir.join("out");
    if !out.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = fs::read_dir(out)
        .expect("read out dir")
        .map(|entry| entry.expect("entry").path())
        .collect();
    files.sort();
    files
}

fn supplier() -> StaticSupplier {
    StaticSupplier::new(&[
        (
            "ccRCC",
            &[
                "Tumor shows clear cytoplasm and nuclear grade 2",
                "Microscopic foci of necrosis",
            ],
        ),
        ("Oncocytoma", &["Eosinophilic granular cytoplasm"]),
    ])
}

#[test]
fn requesting_one_category_processes_only_that_category() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = supplier();

    let outcome = run_batch(
        &store_path,
        &["ccRCC".to_string()],
        &mut supplier,
        &options(dir.path(), Mode::Validation),
    )
    .expect("run batch");

    assert_eq!(
        outcome.run.results.keys().collect::<Vec<_>>(),
        vec!["ccRCC"]
    );
    assert_eq!(supplier.calls, vec!["ccRCC"]);

    let snapshot = load_store(&outcome.snapshot_path).expect("load snapshot");
    assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["ccRCC"]);
    assert_eq!(
        snapshot["ccRCC"],
        vec![
            "Delicate branching vasculature surrounds tumor nests",
            "Hemorrhage is common",
            "Microscopic foci of necrosis",
            "Tumor shows clear cytoplasm and nuclear grade 2",
        ]
    );
}

#[test]
fn unknown_category_fails_without_writing_anything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = supplier();

    let err = run_batch(
        &store_path,
        &["Unknown".to_string()],
        &mut supplier,
        &options(dir.path(), Mode::Validation),
    )
    .unwrap_err();

    match &err {
        CurateError::CategoryNotFound {
            category,
            available,
        } => {
            assert_eq!(category, "Unknown");
            assert_eq!(available, &vec!["Oncocytoma".to_string(), "ccRCC".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(supplier.calls.is_empty());
    assert!(out_files(dir.path()).is_empty());
}

#[test]
fn missing_or_malformed_store_aborts_before_processing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut supplier = supplier();
    let opts = options(dir.path(), Mode::Validation);

    let err = run_batch(&dir.path().join("absent.json"), &[], &mut supplier, &opts).unwrap_err();
    assert!(matches!(err, CurateError::StoreNotFound { .. }));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{\"ccRCC\": [").expect("write");
    let err = run_batch(&bad, &[], &mut supplier, &opts).unwrap_err();
    assert!(matches!(err, CurateError::Parse { .. }));

    assert!(supplier.calls.is_empty());
    assert!(out_files(dir.path()).is_empty());
}

#[test]
fn generation_failure_falls_back_for_that_category_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = StaticSupplier::new(&[("Oncocytoma", &["Eosinophilic granular cytoplasm"])]);

    let outcome = run_batch(
        &store_path,
        &[],
        &mut supplier,
        &options(dir.path(), Mode::Validation),
    )
    .expect("run batch");
    let summary = &outcome.run.summary;

    assert_eq!(summary.categories_processed, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.fallback, 1);
    assert!(matches!(
        summary.statuses["ccRCC"],
        CategoryStatus::Fallback { .. }
    ));
    assert_eq!(
        summary.statuses["Oncocytoma"],
        CategoryStatus::Curated { dropped: 1 }
    );

    let store = load_store(&store_path).expect("reload store");
    assert_eq!(outcome.run.results["ccRCC"].selected, store["ccRCC"]);
    assert_eq!(outcome.run.results["ccRCC"].dropped_count, 0);

    // 3 + 2 original; ccRCC kept as-is, Oncocytoma collapses to 2.
    assert_eq!(summary.total_original, 5);
    assert_eq!(summary.total_selected, 5);
}

#[test]
fn curation_error_falls_back_to_existing_set() {
    let existing: DescriptionSet = vec!["Central stellate scar".to_string()];
    let mut run = BatchRun::default();
    let err = CurateError::Curation {
        category: "Oncocytoma".to_string(),
        message: "report does not match inputs".to_string(),
    };

    record_validation(&mut run, "Oncocytoma", &existing, Err(err)).expect("record");

    assert_eq!(run.results["Oncocytoma"].selected, existing);
    assert_eq!(run.summary.fallback, 1);
    match &run.summary.statuses["Oncocytoma"] {
        CategoryStatus::Fallback { reason } => {
            assert!(reason.contains("report does not match inputs"), "{reason}")
        }
        other => panic!("unexpected status: {other:?}"),
    }
}

#[test]
fn file_level_errors_are_not_recorded_as_fallback() {
    let existing: DescriptionSet = vec!["Central stellate scar".to_string()];
    let mut run = BatchRun::default();
    let err = CurateError::StoreNotFound {
        path: PathBuf::from("store.json"),
    };

    assert!(record_validation(&mut run, "Oncocytoma", &existing, Err(err)).is_err());
    assert!(run.results.is_empty());
    assert_eq!(run.summary.categories_processed, 0);
}

#[test]
fn history_failure_leaves_no_outputs_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let opts = options(dir.path(), Mode::Validation);
    let blocker = history_path(&opts.out_dir);
    fs::create_dir_all(&blocker).expect("block history file");

    let result = run_batch(&store_path, &[], &mut supplier(), &opts);

    assert!(matches!(result, Err(CurateError::Io { .. })));
    assert_eq!(out_files(dir.path()), vec![blocker]);
}

#[test]
fn input_store_is_never_rewritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = supplier();

    let outcome = run_batch(
        &store_path,
        &[],
        &mut supplier,
        &options(dir.path(), Mode::Validation),
    )
    .expect("run batch");

    assert_eq!(fs::read_to_string(&store_path).expect("read"), STORE_JSON);
    assert_ne!(outcome.snapshot_path, store_path);
    let out_dir = fs::canonicalize(dir.path().join("out")).expect("canonical out dir");
    assert_eq!(outcome.out_dir, out_dir);
    assert!(outcome.snapshot_path.starts_with(&out_dir));
}

#[test]
fn summary_and_history_are_written_next_to_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = supplier();
    let opts = options(dir.path(), Mode::Validation);

    let first = run_batch(&store_path, &[], &mut supplier, &opts).expect("first run");
    let second = run_batch(&store_path, &[], &mut supplier, &opts).expect("second run");
    assert_ne!(first.snapshot_path, second.snapshot_path);

    let summary: BatchSummary =
        serde_json::from_str(&fs::read_to_string(&first.summary_path).expect("read summary"))
            .expect("parse summary");
    assert_eq!(summary, first.run.summary);

    let history = fs::read_to_string(history_path(&opts.out_dir)).expect("read history");
    let entries: Vec<HistoryEntry> = history
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse history line"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].snapshot_path, second.snapshot_path);
    assert_eq!(entries[0].mode, "validation");
}

#[test]
fn generation_mode_snapshots_raw_candidates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_path = write_store(dir.path());
    let mut supplier = StaticSupplier::new(&[("ccRCC", &["Clear cells", "Clear cells"])]);

    let outcome = run_batch(
        &store_path,
        &[],
        &mut supplier,
        &options(dir.path(), Mode::Generation),
    )
    .expect("run batch");

    let name = outcome
        .snapshot_path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("name");
    assert!(name.starts_with("candidates-"), "{name}");

    let snapshot = load_store(&outcome.snapshot_path).expect("load snapshot");
    assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["ccRCC"]);
    assert_eq!(snapshot["ccRCC"], vec!["Clear cells", "Clear cells"]);

    let summary = &outcome.run.summary;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(matches!(
        summary.statuses["Oncocytoma"],
        CategoryStatus::Failed { .. }
    ));
}

#[test]
fn duplicate_requests_are_processed_once() {
    let mut store = DescriptionStore::new();
    store.insert("ccRCC".to_string(), vec!["clear cells".to_string()]);
    let categories = select_categories(&store, &["ccRCC".to_string(), "ccRCC".to_string()])
        .expect("select");
    assert_eq!(categories, vec!["ccRCC".to_string()]);
}

#[test]
fn results_do_not_depend_on_category_order() {
    let store = load_store_from_str(STORE_JSON);
    let forward = vec!["ccRCC".to_string(), "Oncocytoma".to_string()];
    let backward = vec!["Oncocytoma".to_string(), "ccRCC".to_string()];

    let a = process_categories(&store, &forward, &mut supplier(), Mode::Validation, DEFAULT_THRESHOLD)
        .expect("forward");
    let b = process_categories(&store, &backward, &mut supplier(), Mode::Validation, DEFAULT_THRESHOLD)
        .expect("backward");
    assert_eq!(a, b);
}

#[test]
fn curating_against_empty_candidates_keeps_everything() {
    let store = load_store_from_str(STORE_JSON);
    let mut empty = StaticSupplier::new(&[("ccRCC", &[]), ("Oncocytoma", &[])]);
    let categories: Vec<Category> = store.keys().cloned().collect();

    let run = process_categories(&store, &categories, &mut empty, Mode::Validation, DEFAULT_THRESHOLD)
        .expect("process");
    for (category, result) in &run.results {
        assert_eq!(&result.selected, &store[category]);
        assert_eq!(result.dropped_count, 0);
    }
}

fn load_store_from_str(text: &str) -> DescriptionStore {
    crate::store::parse_store(Path::new("inline.json"), text.as_bytes()).expect("parse store")
}
