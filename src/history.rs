//! Append-only history of completed batch runs.
//!
//! One JSON line per run keeps past snapshots auditable without touching
//! the snapshots themselves.
use crate::error::{CurateError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HISTORY_SCHEMA_VERSION: u32 = 1;
pub const HISTORY_FILE_NAME: &str = "curation_history.jsonl";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryEntry {
    pub schema_version: u32,
    pub started_at_epoch_ms: u64,
    pub finished_at_epoch_ms: u64,
    pub mode: String,
    pub store_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub categories_processed: usize,
    pub fallback: usize,
    pub total_original: usize,
    pub total_selected: usize,
}

pub fn history_path(out_dir: &Path) -> PathBuf {
    out_dir.join(HISTORY_FILE_NAME)
}

/// Append a history entry as JSONL.
pub fn append_history(out_dir: &Path, entry: &HistoryEntry) -> Result<()> {
    let path = history_path(out_dir);
    fs::create_dir_all(out_dir).map_err(|err| CurateError::io(out_dir, err))?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| CurateError::io(&path, err))?;
    let line = serde_json::to_string(entry).map_err(|err| CurateError::Parse {
        path: path.clone(),
        message: format!("serialize history entry: {err}"),
    })?;
    file.write_all(line.as_bytes())
        .map_err(|err| CurateError::io(&path, err))?;
    file.write_all(b"\n")
        .map_err(|err| CurateError::io(&path, err))?;
    Ok(())
}
