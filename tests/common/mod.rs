//! Shared test infrastructure for integration tests.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const STORE_JSON: &str = r#"{
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

pub const CANDIDATES_JSON: &str = r#"{
  "ccRCC": [
    "Tumor shows clear cytoplasm and nuclear grade 2",
    "Microscopic foci of necrosis"
  ],
  "Oncocytoma": "Eosinophilic granular cytoplasm"
}"#;

/// Summary fields the tests check, parsed from `--json` output.
#[derive(Debug, Deserialize)]
pub struct Summary {
    pub categories_processed: usize,
    pub succeeded: usize,
    pub fallback: usize,
    pub total_original: usize,
    pub total_selected: usize,
    pub statuses: BTreeMap<String, serde_json::Value>,
}

/// Temporary directory holding a store and candidate file.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let workspace = Self { dir };
        workspace.write("store.json", STORE_JSON);
        workspace.write("candidates.json", CANDIDATES_JSON);
        workspace
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.path(name), contents).expect("write fixture");
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// Snapshot files (excluding summaries) written to the output dir.
    pub fn snapshots(&self, prefix: &str) -> Vec<PathBuf> {
        list_json(&self.out_dir())
            .into_iter()
            .filter(|path| {
                let name = file_name(path);
                name.starts_with(prefix) && !name.ends_with(".summary.json")
            })
            .collect()
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dcur"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("DCUR_LM_COMMAND")
            .env("RUST_LOG", "warn")
            .output()
            .expect("run dcur")
    }
}

pub fn read_store(path: &Path) -> BTreeMap<String, Vec<String>> {
    let text = std::fs::read_to_string(path).expect("read store");
    serde_json::from_str(&text).expect("parse store")
}

fn list_json(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}
