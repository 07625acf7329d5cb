//! Format inspection: decide how an input file will be handled.
//!
//! [`classify`] looks at the extension only and never touches the file.
//! [`inspect`] goes further and opens the file to confirm it really is
//! readable in the format its extension claims.

use crate::error::PipelineError;
use crate::output::InputInfo;
use crate::pipeline::{image, merge};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How an input file is handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// `.png`, `.jpg`, `.jpeg`
    Image,
    /// `.docx`
    WordDocument,
    /// `.pdf`
    Pdf,
    /// Anything else, including no extension at all.
    Unsupported,
}

impl FormatKind {
    pub fn is_supported(self) -> bool {
        self != FormatKind::Unsupported
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatKind::Image => "image",
            FormatKind::WordDocument => "word document",
            FormatKind::Pdf => "pdf",
            FormatKind::Unsupported => "unsupported",
        })
    }
}

/// Classify a path by its extension, case-insensitively.
///
/// Pure: the file is not opened and need not exist.
pub fn classify(path: &Path) -> FormatKind {
    match extension_of(path).as_deref() {
        Some("pdf") => FormatKind::Pdf,
        Some("png" | "jpg" | "jpeg") => FormatKind::Image,
        Some("docx") => FormatKind::WordDocument,
        _ => FormatKind::Unsupported,
    }
}

/// Open `path` and report what the pipeline would see.
///
/// PDFs are parsed (page count, header version); images are fully decoded
/// (pixel dimensions); word documents are only stat'ed since rendering them
/// needs the external renderer.
pub fn inspect(path: &Path) -> Result<InputInfo, PipelineError> {
    let kind = classify(path);
    if !kind.is_supported() {
        return Err(unsupported(path));
    }

    let meta = std::fs::metadata(path).map_err(|e| PipelineError::read_failed(path, e))?;
    if meta.is_dir() {
        return Err(PipelineError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
        });
    }

    let mut info = InputInfo {
        path: path.to_path_buf(),
        kind,
        size_bytes: meta.len(),
        page_count: None,
        dimensions: None,
        pdf_version: None,
    };

    match kind {
        FormatKind::Pdf => {
            let doc = merge::load_pdf(path)?;
            info.page_count = Some(doc.get_pages().len());
            info.pdf_version = Some(doc.version.clone());
        }
        FormatKind::Image => {
            let img = image::decode_image(path)?;
            info.dimensions = Some((img.width(), img.height()));
            info.page_count = Some(1);
        }
        FormatKind::WordDocument | FormatKind::Unsupported => {}
    }

    debug!(
        "Inspected {}: {} ({} bytes)",
        path.display(),
        info.kind,
        info.size_bytes
    );
    Ok(info)
}

/// The `.pdf` files directly inside `dir`, sorted by file name.
///
/// Not recursive. Subdirectories and other formats are skipped; the
/// extension match is case-insensitive like [`classify`].
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::read_failed(dir, e))?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::read_failed(dir, e))?;
        let path = entry.path();
        if path.is_file() && classify(&path) == FormatKind::Pdf {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!("Found {} PDFs in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// The [`PipelineError::UnsupportedFormat`] for `path`.
pub(crate) fn unsupported(path: &Path) -> PipelineError {
    PipelineError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: extension_of(path)
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| "(none)".to_string()),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
