//! Word-processor documents → PDF through an external renderer.
//!
//! The pipeline treats the renderer as an untrusted black box behind the
//! [`DocumentRenderer`] trait. [`render_document`] is the only caller: it
//! hands the renderer a scratch output path, catches panics, and refuses a
//! "success" that left no PDF behind.
//!
//! [`SofficeRenderer`] is the default backend. It drives LibreOffice headless:
//!
//! ```text
//! soffice --headless -env:UserInstallation=file://<scratch>/profile \
//!         --convert-to pdf --outdir <scratch>/out <input>
//! ```
//!
//! A private user profile per call lets several conversions run at once;
//! LibreOffice refuses to start a second instance on a shared profile.

use crate::error::{PipelineError, RenderError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Renders a word-processor document to a PDF file.
///
/// Implementations write the complete PDF to `output` and return `Ok(())`.
/// They may be called from several threads at once.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "renderer"
    }
}

// ── LibreOffice ──────────────────────────────────────────────────────────

/// Renders via LibreOffice (`soffice`) in headless mode.
#[derive(Debug, Clone, Default)]
pub struct SofficeRenderer {
    binary: Option<PathBuf>,
}

impl SofficeRenderer {
    /// Locate the binary lazily with [`soffice_locate::locate_soffice`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit `soffice` executable.
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(path.into()),
        }
    }

    fn binary(&self) -> Result<PathBuf, RenderError> {
        match &self.binary {
            Some(p) if p.is_file() => Ok(p.clone()),
            Some(p) => Err(RenderError::Unavailable(format!(
                "soffice binary '{}' does not exist",
                p.display()
            ))),
            None => soffice_locate::locate_soffice()
                .map_err(|e| RenderError::Unavailable(e.to_string())),
        }
    }
}

impl DocumentRenderer for SofficeRenderer {
    fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let binary = self.binary()?;
        let scratch = TempDir::with_prefix("paperstack-soffice-")?;
        let outdir = scratch.path().join("out");
        let profile = scratch.path().join("profile");
        std::fs::create_dir_all(&outdir)?;

        debug!("Running {} on {}", binary.display(), input.display());
        let result = Command::new(&binary)
            .arg("--headless")
            .arg(format!("-env:UserInstallation={}", file_url(&profile)))
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(&outdir)
            .arg(input)
            .output()?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        // LibreOffice names the result after the input stem.
        let mut name = input.file_stem().unwrap_or_default().to_os_string();
        name.push(".pdf");
        let produced = outdir.join(name);
        if !is_nonempty_file(&produced) {
            return Err(RenderError::NoOutput { path: produced });
        }

        std::fs::copy(&produced, output)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "soffice"
    }
}

// ── Other renderers ──────────────────────────────────────────────────────

/// Adapts a closure into a [`DocumentRenderer`].
pub struct FnRenderer<F>(pub F);

impl<F> DocumentRenderer for FnRenderer<F>
where
    F: Fn(&Path, &Path) -> Result<(), RenderError> + Send + Sync,
{
    fn render(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        (self.0)(input, output)
    }

    fn name(&self) -> &str {
        "custom"
    }
}

/// Always fails; for hosts that must never spawn an external process.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRenderer;

impl DocumentRenderer for UnavailableRenderer {
    fn render(&self, _input: &Path, _output: &Path) -> Result<(), RenderError> {
        Err(RenderError::Unavailable(
            "no document renderer is configured".into(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

// ── Pipeline entry ───────────────────────────────────────────────────────

/// Run `renderer` on `input` and return the scratch directory holding the
/// rendered PDF together with its path. The directory is deleted on drop.
pub fn render_document(
    renderer: &dyn DocumentRenderer,
    input: &Path,
) -> Result<(TempDir, PathBuf), PipelineError> {
    let failed = |detail: String| PipelineError::RendererFailed {
        path: input.to_path_buf(),
        detail,
    };

    let scratch = TempDir::with_prefix("paperstack-render-")
        .map_err(|e| failed(format!("cannot create scratch directory: {e}")))?;
    let output = scratch.path().join("rendered.pdf");

    info!("Rendering {} with {}", input.display(), renderer.name());
    let outcome = catch_unwind(AssertUnwindSafe(|| renderer.render(input, &output)));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(failed(e.to_string())),
        Err(panic) => return Err(failed(format!("renderer panicked: {}", panic_message(&*panic)))),
    }

    if !is_nonempty_file(&output) {
        return Err(failed(RenderError::NoOutput { path: output }.to_string()));
    }
    Ok((scratch, output))
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}
