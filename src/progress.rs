//! Progress-callback trait for per-file assembly events.
//!
//! Inject an [`Arc<dyn AssemblyProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to be told as
//! each input file is loaded and appended. A convert request reports a
//! single file; a combine request reports each input in order.
//!
//! # Example
//!
//! ```rust
//! use paperstack::{AssemblyProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl AssemblyProgressCallback for PageCounter {
//!     fn on_file_complete(&self, index: usize, total: usize, pages: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!         eprintln!("file {index}/{total}: {pages} pages");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn AssemblyProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes each input file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indexes are 1-based.
///
/// # Thread safety
///
/// Events for one call arrive sequentially, but the same callback may be
/// shared by concurrent pipeline calls.
pub trait AssemblyProgressCallback: Send + Sync {
    /// Called once before the first input is touched.
    fn on_assembly_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before an input file is read.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called after an input file has been read and its pages appended.
    ///
    /// # Arguments
    /// * `pages`: pages this file contributed (0 for an empty PDF, or for a
    ///   passthrough copy whose pages could not be counted)
    fn on_file_complete(&self, index: usize, total: usize, pages: usize) {
        let _ = (index, total, pages);
    }

    /// Called when an input file fails. No further file events follow.
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the output file has been committed.
    fn on_assembly_complete(&self, total_files: usize, total_pages: usize) {
        let _ = (total_files, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssemblyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn AssemblyProgressCallback>;
