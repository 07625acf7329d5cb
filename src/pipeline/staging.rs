//! Atomic output: stage next to the destination, then rename over it.
//!
//! [`StagedOutput::create`] doubles as the writability check. It creates the
//! temp file in the destination's directory before any conversion work runs,
//! so a bad output path fails fast and the final rename never crosses a
//! filesystem boundary. Dropping a [`StagedOutput`] without committing
//! removes the temp file.

use crate::error::PipelineError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A temp file waiting to replace `dest`.
#[derive(Debug)]
pub struct StagedOutput {
    dest: PathBuf,
    tmp: NamedTempFile,
    written: u64,
}

impl StagedOutput {
    /// Verify `dest` can be replaced and stage a temp file beside it.
    pub fn create(dest: &Path) -> Result<Self, PipelineError> {
        let not_writable = |reason: String| PipelineError::OutputNotWritable {
            path: dest.to_path_buf(),
            reason,
        };

        if dest.is_dir() {
            return Err(not_writable("destination is a directory".into()));
        }

        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(not_writable(format!(
                "directory '{}' does not exist",
                dir.display()
            )));
        }

        let tmp = tempfile::Builder::new()
            .prefix(".paperstack-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| not_writable(e.to_string()))?;

        debug!("Staged {} for {}", tmp.path().display(), dest.display());
        Ok(Self {
            dest: dest.to_path_buf(),
            tmp,
            written: 0,
        })
    }

    /// Path of the staged temp file.
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), PipelineError> {
        self.tmp
            .write_all(bytes)
            .map_err(|e| self.write_failed(e))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Stream the contents of `src` into the staged file.
    pub fn copy_from(&mut self, src: &Path) -> Result<u64, PipelineError> {
        let mut input = File::open(src).map_err(|e| PipelineError::read_failed(src, e))?;
        let n = std::io::copy(&mut input, self.tmp.as_file_mut()).map_err(|e| self.write_failed(e))?;
        self.written += n;
        Ok(n)
    }

    /// Flush, fsync and rename over the destination. Returns bytes written.
    pub fn commit(self) -> Result<u64, PipelineError> {
        let Self { dest, tmp, written } = self;
        let failed = |source: std::io::Error| PipelineError::OutputWriteFailed {
            path: dest.clone(),
            source,
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dest)
                .map(|m| m.permissions().mode() & 0o7777)
                .unwrap_or(0o644);
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(mode))
                .map_err(failed)?;
        }

        tmp.as_file().sync_all().map_err(failed)?;
        tmp.persist(&dest).map_err(|e| failed(e.error))?;

        debug!("Wrote {} bytes to {}", written, dest.display());
        Ok(written)
    }

    fn write_failed(&self, source: std::io::Error) -> PipelineError {
        PipelineError::OutputWriteFailed {
            path: self.dest.clone(),
            source,
        }
    }
}
