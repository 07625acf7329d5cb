//! Configuration for the document assembly pipeline.
//!
//! Every knob lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. A config is cheap to clone (the renderer and
//! progress callback are shared `Arc`s) so one instance can serve many
//! concurrent pipeline calls.

use crate::error::ConfigError;
use crate::pipeline::render::{DocumentRenderer, SofficeRenderer};
use crate::progress::AssemblyProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default image resolution: one pixel per PDF point.
pub const DEFAULT_IMAGE_DPI: u32 = 72;

/// Upper bound accepted for `image_dpi`.
pub const MAX_IMAGE_DPI: u32 = 2400;

/// Configuration for convert and combine requests.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use paperstack::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .image_dpi(300)
///     .outline_per_file(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.image_dpi, 300);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Resolution at which image pixels map onto the page. Range: 1–2400.
    /// Default: 72.
    ///
    /// The image is always embedded at full pixel resolution; this only
    /// sets the page size. A 2480×3508 scan at 300 DPI yields an A4 page.
    pub image_dpi: u32,

    /// Header version written into generated PDFs. Default: `"1.7"`.
    ///
    /// Passthrough copies keep their own header untouched.
    pub pdf_version: String,

    /// Flate-compress uncompressed streams in combined output. Default: false.
    pub compress: bool,

    /// Add one bookmark per input file to combined output. Default: false.
    pub outline_per_file: bool,

    /// Backend for word-processor documents. Default: [`SofficeRenderer`].
    pub renderer: Arc<dyn DocumentRenderer>,

    /// Optional per-file progress callback.
    pub progress_callback: Option<Arc<dyn AssemblyProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_dpi: DEFAULT_IMAGE_DPI,
            pdf_version: "1.7".to_string(),
            compress: false,
            outline_per_file: false,
            renderer: Arc::new(SofficeRenderer::new()),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("image_dpi", &self.image_dpi)
            .field("pdf_version", &self.pdf_version)
            .field("compress", &self.compress)
            .field("outline_per_file", &self.outline_per_file)
            .field("renderer", &self.renderer.name())
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AssemblyProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.config.image_dpi = dpi.clamp(1, MAX_IMAGE_DPI);
        self
    }

    pub fn pdf_version(mut self, version: impl Into<String>) -> Self {
        self.config.pdf_version = version.into();
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn outline_per_file(mut self, v: bool) -> Self {
        self.config.outline_per_file = v;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.config.renderer = renderer;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn AssemblyProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let c = &self.config;
        if c.image_dpi == 0 || c.image_dpi > MAX_IMAGE_DPI {
            return Err(ConfigError::ImageDpi(c.image_dpi));
        }
        if !is_pdf_version(&c.pdf_version) {
            return Err(ConfigError::PdfVersion(c.pdf_version.clone()));
        }
        Ok(self.config)
    }
}

/// `MAJOR.MINOR` as in `%PDF-1.7`.
fn is_pdf_version(v: &str) -> bool {
    match v.split_once('.') {
        Some((major, minor)) => {
            matches!(major, "1" | "2")
                && !minor.is_empty()
                && minor.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
