//! # paperstack
//!
//! Turn PDFs, scans and word-processor documents into PDFs, and stitch many
//! PDFs into one.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input file
//!  │
//!  ├─ 1. Inspect   classify by extension (.pdf .png .jpg .jpeg .docx)
//!  ├─ 2. Convert   PDF: byte copy · image: one page at native size ·
//!  │               docx: external renderer (LibreOffice by default)
//!  ├─ 3. Combine   concatenate PDFs, renumber objects, rebuild page tree
//!  └─ 4. Commit    temp file beside the destination, renamed on success
//! ```
//!
//! A failed call never leaves a partial file behind and never touches an
//! existing file at the destination.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperstack::{run, CombineRequest, PipelineConfig, PipelineResult};
//!
//! let config = PipelineConfig::default();
//! let request = CombineRequest::new(["report1.pdf", "report2.pdf"], "merged.pdf");
//!
//! match run(&request.into(), &config) {
//!     PipelineResult::Success { output } => println!("wrote {}", output.display()),
//!     PipelineResult::Failure { kind, message } => eprintln!("{kind}: {message}"),
//! }
//! ```
//!
//! Inside an async runtime use [`run_async`], which moves the work onto the
//! blocking thread pool.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperstack` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paperstack = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_IMAGE_DPI, MAX_IMAGE_DPI};
pub use convert::{combine, combine_with_stats, convert_to_pdf, convert_with_stats, run, run_async};
pub use error::{ConfigError, ErrorKind, PipelineError, RenderError};
pub use output::{AssemblyStats, InputInfo, PipelineFailure, PipelineResult};
pub use pipeline::inspect::{classify, inspect, list_pdfs, FormatKind};
pub use pipeline::render::{DocumentRenderer, FnRenderer, SofficeRenderer, UnavailableRenderer};
pub use progress::{AssemblyProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::{CombineRequest, ConversionRequest, InputFile, OutputFormat, Request};
