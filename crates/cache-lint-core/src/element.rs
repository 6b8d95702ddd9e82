//! Annotated program elements
//!
//! The host-facing discovery interface: a host adapter turns its own view of
//! the program into [`AnnotatedElement`]s and the walker only ever sees these.

use crate::annotation::{Annotation, AnnotationKind};
use crate::validate::ParameterSet;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Source position used to anchor a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: Option<PathBuf>,
    /// 1-based
    pub line: usize,
    /// 0-based, in characters
    pub column: usize,
}

impl Location {
    pub fn new(file: Option<PathBuf>, line: usize, column: usize) -> Self {
        Location { file, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file.display(), self.line, self.column + 1),
            None => write!(f, "{}:{}", self.line, self.column + 1),
        }
    }
}

/// A method-like declaration carrying cache annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    /// Human-readable signature, return type first
    pub signature: String,
    pub parameters: ParameterSet,
    pub annotations: Vec<Annotation>,
    pub location: Option<Location>,
}

impl Method {
    pub fn new(name: impl Into<String>, signature: impl Into<String>, parameters: ParameterSet) -> Self {
        Method {
            name: name.into(),
            signature: signature.into(),
            parameters,
            annotations: Vec::new(),
            location: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<Annotation>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// First annotation of `kind`, if any
    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }
}

/// Anything a cache annotation was found on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotatedElement {
    Method(Method),
    /// A non-method item, e.g. a struct or a const
    Other {
        description: String,
        /// Cache attributes found on the item
        kinds: Vec<AnnotationKind>,
        location: Option<Location>,
    },
}

impl AnnotatedElement {
    pub fn location(&self) -> Option<&Location> {
        match self {
            AnnotatedElement::Method(method) => method.location.as_ref(),
            AnnotatedElement::Other { location, .. } => location.as_ref(),
        }
    }
}

impl From<Method> for AnnotatedElement {
    fn from(method: Method) -> Self {
        AnnotatedElement::Method(method)
    }
}

/// Host discovery: every element carrying at least one of `kinds`
pub trait ElementSource {
    fn annotated_elements(&self, kinds: &[AnnotationKind]) -> Vec<AnnotatedElement>;
}

impl ElementSource for [AnnotatedElement] {
    fn annotated_elements(&self, kinds: &[AnnotationKind]) -> Vec<AnnotatedElement> {
        self.iter()
            .filter(|element| match element {
                AnnotatedElement::Method(method) => method.annotations.iter().any(|a| kinds.contains(&a.kind())),
                AnnotatedElement::Other { kinds: found, .. } => found.iter().any(|kind| kinds.contains(kind)),
            })
            .cloned()
            .collect()
    }
}

impl ElementSource for Vec<AnnotatedElement> {
    fn annotated_elements(&self, kinds: &[AnnotationKind]) -> Vec<AnnotatedElement> {
        self.as_slice().annotated_elements(kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{CacheOperation, ExprAttribute};

    #[test]
    fn test_annotation_lookup_by_kind() {
        let op = CacheOperation::new(AnnotationKind::CachePut)
            .unwrap()
            .with(ExprAttribute::Key, "#id")
            .unwrap();
        let method = Method::new("update", "() update(id: i32)", ["id"].into_iter().collect()).with_annotation(op);
        assert!(method.annotation(AnnotationKind::CachePut).is_some());
        assert!(method.annotation(AnnotationKind::Cacheable).is_none());
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new(Some(PathBuf::from("src/lib.rs")), 12, 4);
        assert_eq!(loc.to_string(), "src/lib.rs:12:5");
        assert_eq!(Location::new(None, 3, 0).to_string(), "3:1");
    }

    #[test]
    fn test_source_filters_by_kind() {
        let evict = CacheOperation::new(AnnotationKind::CacheEvict).unwrap();
        let elements = vec![
            AnnotatedElement::from(Method::new("a", "() a()", ParameterSet::new()).with_annotation(evict)),
            AnnotatedElement::from(Method::new("b", "() b()", ParameterSet::new())),
        ];
        let found = elements.annotated_elements(&[AnnotationKind::CacheEvict]);
        assert_eq!(found.len(), 1);
        assert!(elements.annotated_elements(&[AnnotationKind::Cacheable]).is_empty());
    }

    #[test]
    fn test_source_filters_misuse_by_kind() {
        let elements = vec![AnnotatedElement::Other {
            description: "struct Author".to_string(),
            kinds: vec![AnnotationKind::CacheEvict],
            location: None,
        }];
        assert!(elements.annotated_elements(&[AnnotationKind::Cacheable]).is_empty());
        assert_eq!(elements.annotated_elements(&AnnotationKind::ALL).len(), 1);
    }
}
