//! Check orchestration
//!
//! Discovers annotated elements, runs the checker over them, and gathers a
//! single report for output.

use crate::cli::discover::{discover, SkippedFile};
use crate::cli::filters::filter_elements;
use anyhow::{Context, Result};
use cache_lint_core::syn_adapter::MalformedAnnotation;
use cache_lint_core::{AnnotatedElement, Checker, Diagnostic, ReservedNames};
use std::path::PathBuf;
use tracing::info;

/// Options for a check run
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub roots: Vec<PathBuf>,
    pub excludes: Vec<String>,
    pub reserved: Vec<String>,
    pub name: Option<String>,
    /// Worker threads; 0 or 1 checks on the calling thread
    pub jobs: usize,
}

/// Outcome of a check run
#[derive(Debug, Default)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub malformed: Vec<MalformedAnnotation>,
    pub skipped: Vec<SkippedFile>,
    pub files_scanned: usize,
    pub methods_checked: usize,
}

impl CheckReport {
    /// Anything that should fail the build
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty() || !self.malformed.is_empty()
    }
}

fn run_checks(checker: &Checker, elements: &[AnnotatedElement], jobs: usize) -> Result<Vec<Diagnostic>> {
    if jobs <= 1 {
        let mut found = Vec::new();
        checker.check_source(elements, &mut found);
        return Ok(found);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("failed to build worker pool")?;
    Ok(pool.install(|| checker.check_all_parallel(elements)))
}

/// Discover and check everything under the configured roots
pub fn run_check(options: &CheckOptions) -> Result<CheckReport> {
    let discovery = discover(&options.roots, &options.excludes)?;
    let files_scanned = discovery.files_scanned();

    let mut elements = Vec::new();
    let mut malformed = Vec::new();
    for file in discovery.files {
        elements.extend(file.elements);
        malformed.extend(file.malformed);
    }
    let elements = filter_elements(elements, options.name.as_deref());
    let methods_checked = elements
        .iter()
        .filter(|e| matches!(e, AnnotatedElement::Method(_)))
        .count();

    let checker = Checker::new(ReservedNames::with_extra(options.reserved.iter().cloned()));
    let diagnostics = run_checks(&checker, &elements, options.jobs)?;

    info!(
        files = files_scanned,
        methods = methods_checked,
        diagnostics = diagnostics.len(),
        malformed = malformed.len(),
        "check complete"
    );

    Ok(CheckReport {
        diagnostics,
        malformed,
        skipped: discovery.skipped,
        files_scanned,
        methods_checked,
    })
}

/// Discover annotated elements without checking them
pub fn list_elements(roots: &[PathBuf], excludes: &[String]) -> Result<Vec<AnnotatedElement>> {
    let discovery = discover(roots, excludes)?;
    Ok(discovery.files.into_iter().flat_map(|f| f.elements).collect())
}
