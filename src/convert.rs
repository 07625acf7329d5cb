//! Pipeline entry points.
//!
//! Every public function here follows the same contract:
//!
//! 1. Stage the output first. A destination that cannot be written fails
//!    before any input is read or any renderer is started.
//! 2. Produce the complete output in the staged temp file.
//! 3. Rename it over the destination. On any failure the temp file is
//!    removed and the destination is left exactly as it was.
//!
//! Panics inside the pipeline (or inside a custom renderer) never escape:
//! they are reported as [`ErrorKind::IoError`] failures.
//!
//! [`ErrorKind::IoError`]: crate::error::ErrorKind::IoError

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{AssemblyStats, PipelineResult};
use crate::pipeline::inspect::{self, FormatKind};
use crate::pipeline::merge::{self, MergeOptions, Merger};
use crate::pipeline::render::{self, panic_message};
use crate::pipeline::{image, staging::StagedOutput};
use crate::request::{InputFile, Request};
use lopdf::Document;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run a convert or combine request.
///
/// This is the primary entry point for the library. It blocks; use
/// [`run_async`] from inside a Tokio runtime.
pub fn run(request: &Request, config: &PipelineConfig) -> PipelineResult {
    match request {
        Request::Convert(r) => convert_to_pdf(&r.input, &r.output, config),
        Request::Combine(r) => combine(&r.inputs, &r.output, config),
    }
}

/// Async wrapper around [`run`].
///
/// The blocking work runs on Tokio's blocking thread pool so it never stalls
/// the async worker threads.
pub async fn run_async(request: Request, config: PipelineConfig) -> PipelineResult {
    let joined = tokio::task::spawn_blocking(move || run(&request, &config)).await;
    joined.unwrap_or_else(|e| {
        PipelineResult::from(&PipelineError::Internal(format!(
            "pipeline task failed: {e}"
        )))
    })
}

/// Convert one file to PDF at `output`.
///
/// * PDF: copied byte for byte.
/// * Image: embedded at native resolution on a single page.
/// * Word document: handed to [`PipelineConfig::renderer`].
/// * Anything else: `UnsupportedFormat`, without invoking the renderer.
pub fn convert_to_pdf(input: &InputFile, output: &Path, config: &PipelineConfig) -> PipelineResult {
    let result = guarded(|| convert_file(input, output, config)).map(|_| output.to_path_buf());
    report(result)
}

/// Concatenate `inputs` (all PDFs) into one PDF at `output`.
pub fn combine(inputs: &[InputFile], output: &Path, config: &PipelineConfig) -> PipelineResult {
    let result = combine_with_stats(inputs, output, config).map(|_| output.to_path_buf());
    report(result)
}

/// [`combine`], returning statistics instead of a [`PipelineResult`].
pub fn combine_with_stats(
    inputs: &[InputFile],
    output: &Path,
    config: &PipelineConfig,
) -> Result<AssemblyStats, PipelineError> {
    guarded(|| combine_files(inputs, output, config))
}

/// [`convert_to_pdf`], returning statistics instead of a [`PipelineResult`].
pub fn convert_with_stats(
    input: &InputFile,
    output: &Path,
    config: &PipelineConfig,
) -> Result<AssemblyStats, PipelineError> {
    guarded(|| convert_file(input, output, config))
}

// ── Single file ──────────────────────────────────────────────────────────

fn convert_file(
    input: &InputFile,
    output: &Path,
    config: &PipelineConfig,
) -> Result<AssemblyStats, PipelineError> {
    let start = Instant::now();
    let path = input.path();
    info!("Converting {} ({}) → {}", path.display(), input.kind(), output.display());

    let mut staged = StagedOutput::create(output)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_start(1);
        cb.on_file_start(1, 1, path);
    }

    let pages = match write_converted(input, &mut staged, config) {
        Ok(pages) => pages,
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(1, 1, &e.to_string());
            }
            return Err(e);
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_file_complete(1, 1, pages);
    }

    let bytes_written = staged.commit()?;
    let stats = AssemblyStats {
        files: 1,
        pages,
        bytes_written,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Converted {} → {} ({} pages, {} bytes, {}ms)",
        path.display(),
        output.display(),
        stats.pages,
        stats.bytes_written,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_complete(1, pages);
    }
    Ok(stats)
}

/// Fill `staged` with the PDF for `input`. Returns the page count, or 0 if
/// a passthrough copy could not be counted.
fn write_converted(
    input: &InputFile,
    staged: &mut StagedOutput,
    config: &PipelineConfig,
) -> Result<usize, PipelineError> {
    let path = input.path();

    if !input.kind().is_supported() {
        return Err(inspect::unsupported(path));
    }
    if !path.is_file() {
        let meta = std::fs::metadata(path).map_err(|e| PipelineError::read_failed(path, e))?;
        debug!("{} is not a regular file: {:?}", path.display(), meta.file_type());
        return Err(PipelineError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    match input.kind() {
        FormatKind::Pdf => {
            staged.copy_from(path)?;
            Ok(count_pages(path))
        }
        FormatKind::Image => {
            let bytes = image::convert_image(path, config.image_dpi, &config.pdf_version)?;
            staged.write_all(&bytes)?;
            Ok(1)
        }
        FormatKind::WordDocument => {
            let (_scratch, rendered) = render::render_document(config.renderer.as_ref(), path)?;
            staged.copy_from(&rendered)?;
            Ok(count_pages(&rendered))
        }
        FormatKind::Unsupported => Err(inspect::unsupported(path)),
    }
}

/// Page count from the xref and page tree only; 0 when unreadable.
fn count_pages(path: &Path) -> usize {
    match Document::load_metadata(path) {
        Ok(meta) => meta.page_count as usize,
        Err(e) => {
            debug!("Could not count pages of {}: {}", path.display(), e);
            0
        }
    }
}

// ── Multi file ───────────────────────────────────────────────────────────

fn combine_files(
    inputs: &[InputFile],
    output: &Path,
    config: &PipelineConfig,
) -> Result<AssemblyStats, PipelineError> {
    if inputs.is_empty() {
        return Err(PipelineError::EmptyRequest);
    }

    let start = Instant::now();
    let total = inputs.len();
    info!("Combining {} files → {}", total, output.display());

    let mut staged = StagedOutput::create(output)?;

    if let Some(bad) = inputs.iter().find(|f| f.kind() != FormatKind::Pdf) {
        return Err(inspect::unsupported(bad.path()));
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_start(total);
    }

    let mut merger = Merger::new(MergeOptions {
        pdf_version: config.pdf_version.clone(),
        outline_per_file: config.outline_per_file,
        compress: config.compress,
    });

    for (i, input) in inputs.iter().enumerate() {
        let index = i + 1;
        let path = input.path();
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(index, total, path);
        }

        let appended = merge::load_pdf(path).and_then(|doc| merger.append(path, &doc));
        match appended {
            Ok(pages) => {
                debug!("[{}/{}] {}: {} pages", index, total, path.display(), pages);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(index, total, pages);
                }
            }
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_error(index, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    let merged = merger.finish()?;
    staged.write_all(&merged.bytes)?;
    let bytes_written = staged.commit()?;

    let stats = AssemblyStats {
        files: total,
        pages: merged.page_count,
        bytes_written,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Combined {} files → {} ({} pages, {} bytes, {}ms)",
        stats.files,
        output.display(),
        stats.pages,
        stats.bytes_written,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_complete(total, merged.page_count);
    }
    Ok(stats)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run `f`, turning a panic into [`PipelineError::Internal`].
fn guarded<T>(f: impl FnOnce() -> Result<T, PipelineError>) -> Result<T, PipelineError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(PipelineError::Internal(format!(
            "pipeline panicked: {}",
            panic_message(&*payload)
        )))
    })
}

fn report(result: Result<std::path::PathBuf, PipelineError>) -> PipelineResult {
    if let Err(ref e) = result {
        warn!("{} ({})", e, e.kind());
    }
    PipelineResult::from(result)
}
