use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurateError>;

#[derive(Error, Debug)]
pub enum CurateError {
    #[error("category {category:?} not found (available: {})", .available.join(", "))]
    CategoryNotFound {
        category: String,
        available: Vec<String>,
    },

    #[error("store not found: {}", .path.display())]
    StoreNotFound { path: PathBuf },

    #[error("parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("candidate generation failed for {category}: {message}")]
    Generation { category: String, message: String },

    #[error("curation failed for {category}: {message}")]
    Curation { category: String, message: String },

    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CurateError {
    /// Failures that only affect one category and are recovered by falling
    /// back to the existing set.
    pub fn is_category_level(&self) -> bool {
        matches!(
            self,
            CurateError::Generation { .. } | CurateError::Curation { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CurateError::Io {
            path: path.into(),
            source,
        }
    }
}
