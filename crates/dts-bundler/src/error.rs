use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("entry file not found: {0}")]
    EntryNotFound(PathBuf),
    #[error("failed to read {path}: {message}")]
    ReadError { path: PathBuf, message: String },
}
