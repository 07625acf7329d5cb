//! # soffice-locate
//!
//! Find a [LibreOffice](https://www.libreoffice.org/) executable that can be
//! driven headless (`soffice --headless --convert-to pdf …`) to turn
//! word-processor documents into PDF.
//!
//! ## How it works
//!
//! On first call to [`locate_soffice`]:
//!
//! 1. If `PAPERSTACK_SOFFICE` is set, that path is used (and must exist).
//! 2. Otherwise `soffice` and then `libreoffice` are looked up on `PATH`.
//! 3. Otherwise the platform's well-known install locations are probed
//!    (see [`candidate_paths`]).
//!
//! The first hit is cached for the lifetime of the process, so subsequent
//! calls never touch the filesystem.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use soffice_locate::{is_soffice_available, locate_soffice};
//!
//! if is_soffice_available() {
//!     let soffice = locate_soffice().expect("checked above");
//!     println!("using {}", soffice.display());
//! }
//! ```
//!
//! ## Platform defaults
//!
//! | OS      | Probed locations                                              |
//! |---------|---------------------------------------------------------------|
//! | macOS   | `/Applications/LibreOffice.app/…/soffice`, `~/Applications/…` |
//! | Linux   | `/usr/lib/libreoffice/program`, `/opt/libreoffice*/program`, snap |
//! | Windows | `Program Files\LibreOffice\program\soffice.exe` (both arches) |

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming an explicit soffice binary.
pub const ENV_OVERRIDE: &str = "PAPERSTACK_SOFFICE";

/// Executable names tried on `PATH`, in order.
pub const BINARY_NAMES: &[&str] = &["soffice", "libreoffice"];

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by soffice-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// `PAPERSTACK_SOFFICE` points at something that is not a file.
    #[error("PAPERSTACK_SOFFICE is set to '{path}', but no file exists there")]
    OverrideMissing { path: PathBuf },

    /// Nothing usable on `PATH` or in any well-known location.
    #[error(
        "LibreOffice (soffice) was not found on PATH or in {} default location(s).\n\
Install LibreOffice or set PAPERSTACK_SOFFICE=/path/to/soffice.",
        .searched.len()
    )]
    NotFound { searched: Vec<PathBuf> },
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the path to a LibreOffice executable, resolving it on first use.
///
/// Only successful lookups are cached; a failed lookup is retried on the
/// next call so that installing LibreOffice mid-process is picked up.
///
/// # Thread safety
///
/// Safe to call from multiple threads; concurrent first calls may each
/// probe the filesystem but all observe the same cached result afterwards.
pub fn locate_soffice() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = find_soffice()?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Returns `true` if [`locate_soffice`] would succeed.
pub fn is_soffice_available() -> bool {
    locate_soffice().is_ok()
}

/// Uncached lookup using the process environment.
pub fn find_soffice() -> Result<PathBuf, LocateError> {
    let override_path = std::env::var_os(ENV_OVERRIDE)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let path_var = std::env::var_os("PATH");

    find_soffice_in(override_path.as_deref(), path_var, &candidate_paths())
}

/// Lookup with every input made explicit.
///
/// `override_path` wins outright; `path_var` is searched with
/// [`which::which_in`]; `candidates` are probed last, in order.
pub fn find_soffice_in(
    override_path: Option<&Path>,
    path_var: Option<OsString>,
    candidates: &[PathBuf],
) -> Result<PathBuf, LocateError> {
    // 1. Explicit override.
    if let Some(p) = override_path {
        return if p.is_file() {
            Ok(p.to_path_buf())
        } else {
            Err(LocateError::OverrideMissing {
                path: p.to_path_buf(),
            })
        };
    }

    // 2. PATH.
    if let Some(path_var) = path_var {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        for name in BINARY_NAMES {
            if let Ok(found) = which::which_in(name, Some(&path_var), &cwd) {
                return Ok(found);
            }
        }
    }

    // 3. Well-known install locations.
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| LocateError::NotFound {
            searched: candidates.to_vec(),
        })
}

/// Well-known LibreOffice install locations for the current platform.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    match std::env::consts::OS {
        "macos" => {
            let bundle = Path::new("LibreOffice.app/Contents/MacOS/soffice");
            paths.push(Path::new("/Applications").join(bundle));
            if let Some(home) = dirs::home_dir() {
                paths.push(home.join("Applications").join(bundle));
            }
        }
        "windows" => {
            for var in ["ProgramFiles", "ProgramW6432", "ProgramFiles(x86)"] {
                if let Some(base) = std::env::var_os(var) {
                    paths.push(
                        PathBuf::from(base)
                            .join("LibreOffice")
                            .join("program")
                            .join("soffice.exe"),
                    );
                }
            }
        }
        _ => {
            paths.push(PathBuf::from("/usr/lib/libreoffice/program/soffice"));
            paths.push(PathBuf::from("/usr/lib64/libreoffice/program/soffice"));
            paths.push(PathBuf::from("/usr/local/lib/libreoffice/program/soffice"));
            paths.push(PathBuf::from("/snap/bin/libreoffice"));
            paths.extend(opt_installs(Path::new("/opt")));
        }
    }

    paths.dedup();
    paths
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Upstream tarballs install as `/opt/libreofficeX.Y/program/soffice`.
/// Sorted by directory name, descending.
fn opt_installs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("libreoffice"))
        })
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(install_version(d)));

    dirs.into_iter()
        .map(|d| d.join("program").join("soffice"))
        .collect()
}

/// Numeric components of a `libreoffice<major>.<minor>` directory name, so
/// `24.2` sorts above `7.6`. Unversioned names sort lowest.
fn install_version(dir: &Path) -> Vec<u32> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("libreoffice"))
        .map(|v| v.split('.').map_while(|part| part.parse().ok()).collect())
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
