//! Result types returned by the pipeline.

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::inspect::FormatKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Outcome of one pipeline call. There is no partial success: on
/// `Failure` nothing was written at the destination.
///
/// Serialises as `{"status": "success", "output": "..."}` or
/// `{"status": "failure", "kind": "invalid_pdf", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Success { output: PathBuf },
    Failure { kind: ErrorKind, message: String },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    /// The written file, on success.
    pub fn output(&self) -> Option<&Path> {
        match self {
            PipelineResult::Success { output } => Some(output),
            PipelineResult::Failure { .. } => None,
        }
    }

    /// The failure category, on failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            PipelineResult::Success { .. } => None,
            PipelineResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Convert into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<PathBuf, PipelineFailure> {
        match self {
            PipelineResult::Success { output } => Ok(output),
            PipelineResult::Failure { kind, message } => Err(PipelineFailure { kind, message }),
        }
    }
}

impl From<&PipelineError> for PipelineResult {
    fn from(e: &PipelineError) -> Self {
        PipelineResult::Failure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Result<PathBuf, PipelineError>> for PipelineResult {
    fn from(r: Result<PathBuf, PipelineError>) -> Self {
        match r {
            Ok(output) => PipelineResult::Success { output },
            Err(e) => PipelineResult::from(&e),
        }
    }
}

/// The error half of [`PipelineResult::into_result`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PipelineFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// What [`crate::inspect`] found out about one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    pub path: PathBuf,
    pub kind: FormatKind,
    pub size_bytes: u64,
    /// Pages in a PDF; 1 for an image.
    pub page_count: Option<usize>,
    /// Pixel width and height of an image.
    pub dimensions: Option<(u32, u32)>,
    /// Header version of a PDF, e.g. `"1.7"`.
    pub pdf_version: Option<String>,
}

/// Statistics for one successful convert or combine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// Input files processed.
    pub files: usize,
    /// Pages in the written PDF. Zero when a passthrough copy could not be
    /// counted.
    pub pages: usize,
    pub bytes_written: u64,
    pub duration_ms: u64,
}
