//! Description store documents: loading, normalization, and snapshots.
//!
//! A store is a JSON object mapping category names to description lists.
//! Inputs are only ever read; results go to new timestamped snapshots.
use crate::error::{CurateError, Result};
use crate::types::{Category, DescriptionSet};
use crate::util::now_epoch_ms;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type DescriptionStore = BTreeMap<Category, DescriptionSet>;

/// Read and normalize a store document.
pub fn load_store(path: &Path) -> Result<DescriptionStore> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => CurateError::StoreNotFound {
            path: path.to_path_buf(),
        },
        _ => CurateError::io(path, err),
    })?;
    parse_store(path, &bytes)
}

/// Parse store bytes. Each value may be a list of strings or a lone string.
pub fn parse_store(path: &Path, bytes: &[u8]) -> Result<DescriptionStore> {
    let parse_error = |message: String| CurateError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let value: Value = serde_json::from_slice(bytes).map_err(|err| parse_error(err.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(parse_error(
            "expected an object mapping category to descriptions".to_string(),
        ));
    };

    let mut store = DescriptionStore::new();
    for (category, value) in entries {
        let descriptions = normalize_descriptions(value).ok_or_else(|| {
            parse_error(format!(
                "category {category:?} must be a string or a list of strings"
            ))
        })?;
        store.insert(category, descriptions);
    }
    Ok(store)
}

fn normalize_descriptions(value: Value) -> Option<DescriptionSet> {
    match value {
        Value::String(text) => Some(vec![text]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Output file that is fully written but not yet visible under its final
/// name. Dropping it without [`StagedFile::publish`] removes it.
pub struct StagedFile {
    file: NamedTempFile,
    target: Option<PathBuf>,
}

impl StagedFile {
    /// Path the file will have once published.
    pub fn path(&self) -> &Path {
        self.target.as_deref().unwrap_or_else(|| self.file.path())
    }

    pub fn publish(self) -> Result<PathBuf> {
        match self.target {
            None => {
                let path = self.file.path().to_path_buf();
                let (_, path) = self
                    .file
                    .keep()
                    .map_err(|err| CurateError::io(&path, err.error))?;
                Ok(path)
            }
            Some(target) => {
                self.file
                    .persist_noclobber(&target)
                    .map_err(|err| CurateError::io(&target, err.error))?;
                Ok(target)
            }
        }
    }
}

/// Stage `value` as pretty JSON in a new `<prefix>-<epoch_ms>-<random>.json`
/// under `out_dir`. The random name is reserved on creation, so snapshots
/// never collide.
pub fn stage_snapshot<T: Serialize>(out_dir: &Path, prefix: &str, value: &T) -> Result<StagedFile> {
    let file = tempfile::Builder::new()
        .prefix(&format!("{prefix}-{}-", now_epoch_ms()))
        .suffix(".json")
        .rand_bytes(6)
        .tempfile_in(out_dir)
        .map_err(|err| CurateError::io(out_dir, err))?;
    fill(file, value, None)
}

/// Stage a sidecar that is published next to `snapshot`.
pub fn stage_sidecar<T: Serialize>(
    snapshot: &StagedFile,
    kind: &str,
    value: &T,
) -> Result<StagedFile> {
    let target = sidecar_path(snapshot.path(), kind);
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = tempfile::Builder::new()
        .prefix(".dcur-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| CurateError::io(dir, err))?;
    fill(file, value, Some(target))
}

fn fill<T: Serialize>(
    mut file: NamedTempFile,
    value: &T,
    target: Option<PathBuf>,
) -> Result<StagedFile> {
    let text = serde_json::to_string_pretty(value).map_err(|err| CurateError::Parse {
        path: file.path().to_path_buf(),
        message: format!("serialize: {err}"),
    })?;
    if let Err(err) = write_synced(file.as_file_mut(), text.as_bytes()) {
        return Err(CurateError::io(file.path(), err));
    }
    set_published_mode(file.as_file()).map_err(|err| CurateError::io(file.path(), err))?;
    Ok(StagedFile { file, target })
}

fn write_synced(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

/// Temp files start out owner-only; snapshots are ordinary documents.
fn set_published_mode(file: &fs::File) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    #[cfg(not(unix))]
    {
        let _ = file;
    }
    Ok(())
}

/// Path for a sidecar next to a snapshot, e.g. `curated-1-ab.summary.json`.
pub fn sidecar_path(snapshot: &Path, kind: &str) -> PathBuf {
    let stem = snapshot
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("snapshot");
    snapshot.with_file_name(format!("{stem}.{kind}.json"))
}
