//! Error types for the paperstack library.
//!
//! Two layers reflect two audiences:
//!
//! * [`PipelineError`] is **descriptive**: one variant per thing that can go
//!   wrong, carrying the offending path. Returned as `Err(PipelineError)`
//!   from the component functions and from [`crate::pipeline::inspect::inspect`].
//!
//! * [`ErrorKind`] is **closed**: the five failure categories callers branch
//!   on. Every [`PipelineError`] maps to exactly one kind via
//!   [`PipelineError::kind`], and [`crate::output::PipelineResult::Failure`]
//!   carries the kind plus the error's `Display` text.
//!
//! [`RenderError`] is the error type of the external document-renderer
//! collaborator; the pipeline never lets it through unwrapped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure category reported in [`crate::output::PipelineResult::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Extension not recognised, or content not decodable in its format.
    UnsupportedFormat,
    /// Classified as PDF but failed to parse.
    InvalidPdf,
    /// The external document renderer failed.
    UnsupportedRenderer,
    /// Path unwritable, disk full, permission denied, or anything unexpected.
    IoError,
    /// Combine called with zero files.
    EmptyRequest,
}

impl ErrorKind {
    /// Stable identifier, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::InvalidPdf => "invalid_pdf",
            ErrorKind::UnsupportedRenderer => "unsupported_renderer",
            ErrorKind::IoError => "io_error",
            ErrorKind::EmptyRequest => "empty_request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors produced by the paperstack pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Extension is not one of the supported formats.
    #[error("Unsupported file type '{extension}' for '{path}'\nSupported: .pdf, .png, .jpg, .jpeg, .docx")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// File has an image extension but the image codec rejected it.
    #[error("Cannot decode image '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("'{path}' is not a valid PDF: {detail}")]
    InvalidPdf { path: PathBuf, detail: String },

    /// PDF requires a password and could not be opened with an empty one.
    #[error("'{path}' is an encrypted PDF and cannot be combined without its password")]
    EncryptedPdf { path: PathBuf },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The document renderer failed, panicked, or produced no output.
    #[error("Could not render '{path}' to PDF: {detail}")]
    RendererFailed { path: PathBuf, detail: String },

    // ── Request errors ────────────────────────────────────────────────────
    /// Combine request with no input files.
    #[error("Nothing to combine: the request contains no input files")]
    EmptyRequest,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The output location cannot receive a new file.
    #[error("Cannot write output '{path}': {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    /// Staging or renaming the output file failed.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading an input file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// The closed category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::UnsupportedFormat { .. } | PipelineError::ImageDecode { .. } => {
                ErrorKind::UnsupportedFormat
            }
            PipelineError::InvalidPdf { .. } | PipelineError::EncryptedPdf { .. } => {
                ErrorKind::InvalidPdf
            }
            PipelineError::RendererFailed { .. } => ErrorKind::UnsupportedRenderer,
            PipelineError::EmptyRequest => ErrorKind::EmptyRequest,
            PipelineError::InputNotFound { .. }
            | PipelineError::OutputNotWritable { .. }
            | PipelineError::OutputWriteFailed { .. }
            | PipelineError::Io { .. }
            | PipelineError::Internal(_) => ErrorKind::IoError,
        }
    }

    /// Map an I/O error on an input path, distinguishing "not found".
    pub(crate) fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputNotFound { path }
        } else {
            PipelineError::Io { path, source }
        }
    }
}

/// Errors returned by a [`crate::pipeline::render::DocumentRenderer`].
#[derive(Debug, Error)]
pub enum RenderError {
    /// No rendering backend is installed or configured.
    #[error("document renderer unavailable: {0}")]
    Unavailable(String),

    /// The backend ran but reported failure.
    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The backend claimed success but the expected file is missing or empty.
    #[error("renderer produced no output at '{path}'")]
    NoOutput { path: PathBuf },

    /// I/O around the renderer (temp dirs, copying the result).
    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else a custom renderer wants to report.
    #[error("{0}")]
    Other(String),
}

/// Rejected by [`crate::config::PipelineConfigBuilder::build`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("image DPI must be 1–2400, got {0}")]
    ImageDpi(u32),

    #[error("PDF version must look like '1.7' or '2.0', got '{0}'")]
    PdfVersion(String),
}
