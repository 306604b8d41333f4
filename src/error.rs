//! Error taxonomy for the analysis core.
//!
//! Store-level code (the `GraphStore` trait and its implementations) works in
//! `anyhow::Result`; everything above it reports one of three failure kinds:
//!
//! - [`AnalysisError::DataAccess`]: the backing store is unreachable or a query failed
//! - [`AnalysisError::Validation`]: a caller supplied an unknown network type,
//!   algorithm or format name
//! - [`AnalysisError::Write`]: an export destination could not be written
//!
//! Failing quality criteria and empty networks are results, not errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Backing store unreachable or query malformed
    #[error("data access failed: {0:#}")]
    DataAccess(anyhow::Error),

    /// Malformed parameter (unknown network type, algorithm, format)
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// Export destination unwritable
    #[error("cannot write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

impl AnalysisError {
    pub(crate) fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Whether this error came from the backing store.
    pub fn is_data_access(&self) -> bool {
        matches!(self, Self::DataAccess(_))
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::DataAccess(err)
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
