//! Source discovery
//!
//! Walks the given roots for `.rs` files and collects their annotated elements

use anyhow::{bail, Context, Result};
use cache_lint_core::syn_adapter::{scan_source, ScannedFile};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["target", ".git", ".cargo"];

/// A file that could not be read or parsed
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything found under the scanned roots
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl Discovery {
    pub fn files_scanned(&self) -> usize {
        self.files.len() + self.skipped.len()
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry, excludes: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() > 0 && entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()) {
        return true;
    }
    let path = entry.path().to_string_lossy();
    excludes.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// Collect `.rs` files under `roots`; a root may itself be a file
pub fn rust_files(roots: &[PathBuf], excludes: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            bail!("path does not exist: {}", root.display());
        }
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e, excludes))
        {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                files.push(path.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// Read and scan one file
pub fn scan_path(path: &Path) -> std::result::Result<ScannedFile, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("failed to read: {}", e))?;
    scan_source(&content, Some(path)).map_err(|e| {
        let start = e.span().start();
        format!("failed to parse at {}:{}: {}", start.line, start.column + 1, e)
    })
}

/// Scan every Rust file under `roots`.
///
/// Unreadable or unparsable files are recorded and skipped.
pub fn discover(roots: &[PathBuf], excludes: &[String]) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    for path in rust_files(roots, excludes)? {
        match scan_path(&path) {
            Ok(scanned) => {
                debug!(
                    file = %path.display(),
                    elements = scanned.elements.len(),
                    "scanned file"
                );
                discovery.files.push(scanned);
            }
            Err(reason) => {
                warn!(file = %path.display(), %reason, "skipping file");
                discovery.skipped.push(SkippedFile { path, reason });
            }
        }
    }
    Ok(discovery)
}
