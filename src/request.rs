//! Request types accepted by [`crate::run`].

use crate::pipeline::inspect::{classify, FormatKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An input path together with its classification.
///
/// Classification happens once, in [`InputFile::new`], and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    path: PathBuf,
    kind: FormatKind,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = classify(&path);
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }
}

/// Target format of a single-file conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pdf,
}

/// Convert one file to PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: InputFile,
    pub output: PathBuf,
    pub format: OutputFormat,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: InputFile::new(input),
            output: output.into(),
            format: OutputFormat::Pdf,
        }
    }
}

/// Concatenate PDFs in order. Page order is file order, then page order
/// within each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineRequest {
    pub inputs: Vec<InputFile>,
    pub output: PathBuf,
}

impl CombineRequest {
    pub fn new<I, P>(inputs: I, output: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(InputFile::new).collect(),
            output: output.into(),
        }
    }
}

/// Everything the pipeline facade can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Convert(ConversionRequest),
    Combine(CombineRequest),
}

impl Request {
    /// Destination path of the request.
    pub fn output(&self) -> &Path {
        match self {
            Request::Convert(r) => &r.output,
            Request::Combine(r) => &r.output,
        }
    }
}

impl From<ConversionRequest> for Request {
    fn from(r: ConversionRequest) -> Self {
        Request::Convert(r)
    }
}

impl From<CombineRequest> for Request {
    fn from(r: CombineRequest) -> Self {
        Request::Combine(r)
    }
}
