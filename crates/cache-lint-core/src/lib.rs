//! # cache-lint-core
//!
//! Build-time checking of cache annotation expressions.
//!
//! The `key`, `condition` and `unless` attributes of `#[cacheable]`,
//! `#[cache_evict]`, `#[cache_put]` and `#[caching]` hold small expressions
//! evaluated against the annotated method's arguments. A `#name` reference
//! that matches no argument evaluates to nothing at runtime instead of
//! failing. This crate finds those references ahead of time.
//!
//! ## Usage
//!
//! ```rust
//! use cache_lint_core::{extract_identifiers, validate, ParameterSet, ReservedNames};
//!
//! let ids: Vec<&str> = extract_identifiers("#id_author + #result").collect();
//! let params: ParameterSet = ["id"].into_iter().collect();
//! let missing = validate(ids, &params, &ReservedNames::default());
//! assert_eq!(missing[0].identifier, "id_author");
//! ```
//!
//! The pieces:
//! 1. [`extract`] scans an expression for `#identifier` tokens
//! 2. [`validate`](mod@validate) keeps the ones that are neither parameters nor reserved
//! 3. [`walker`] drives both over every annotation on every element
//! 4. [`syn_adapter`] builds elements from Rust source

pub mod annotation;
pub mod diagnostic;
pub mod element;
pub mod extract;
pub mod syn_adapter;
pub mod validate;
pub mod walker;

pub use annotation::{Annotation, AnnotationError, AnnotationKind, CacheOperation, Caching, ExprAttribute};
pub use diagnostic::{Diagnostic, DiagnosticSink, Severity, SharedSink, Violation};
pub use element::{AnnotatedElement, ElementSource, Location, Method};
pub use extract::{extract_identifiers, identifier_tokens, Expression, IdentifierToken};
pub use validate::{validate, ParameterSet, ReservedNames, Unresolved};
pub use walker::{check, Checker};
