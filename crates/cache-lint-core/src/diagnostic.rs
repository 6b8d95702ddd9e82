//! Diagnostics produced by a check run
//!
//! Two categories exist: an annotation placed on something that is not a
//! method, and an expression identifier that resolves to nothing. Both are
//! errors; neither stops the run.

use crate::annotation::{AnnotationKind, ExprAttribute};
use crate::element::Location;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
        }
    }
}

/// An unresolved identifier and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub identifier: String,
    /// Attribute whose expression referenced the identifier
    pub attribute: ExprAttribute,
    pub annotation_kind: AnnotationKind,
    /// Rendered owning annotation
    pub annotation: String,
    /// Signature of the owning method
    pub method: String,
    pub expression: String,
    /// Byte span of `#identifier` within `expression`
    pub span: Range<usize>,
    pub location: Option<Location>,
}

/// A reportable finding
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("cache annotation for element that is not a method: {element}")]
    NotAMethod {
        element: String,
        location: Option<Location>,
    },
    #[error(
        "Key {} for annotation {} not found in parameters of method {}",
        .0.identifier, .0.annotation, .0.method
    )]
    UnresolvedReference(Violation),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        Severity::Error
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Diagnostic::NotAMethod { location, .. } => location.as_ref(),
            Diagnostic::UnresolvedReference(violation) => violation.location.as_ref(),
        }
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Diagnostic::UnresolvedReference(violation) => Some(violation),
            Diagnostic::NotAMethod { .. } => None,
        }
    }
}

/// Receiver for diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Thread-safe accumulator; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct SharedSink {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything collected so far
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl DiagnosticSink for SharedSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
