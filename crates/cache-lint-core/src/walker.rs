//! Annotation walking
//!
//! Maps every annotation instance on an element to its expression attributes,
//! runs extraction and validation for each, and forwards the findings to a
//! [`DiagnosticSink`]. A `caching` group is opened one level: its children are
//! checked against the enclosing method's parameters like top-level ones.
//!
//! The run is batch: nothing here stops early on a finding.

use crate::annotation::{Annotation, AnnotationKind, CacheOperation};
use crate::diagnostic::{Diagnostic, DiagnosticSink, Violation};
use crate::element::{AnnotatedElement, ElementSource, Method};
use crate::extract::identifier_tokens;
use crate::validate::{validate, ParameterSet, ReservedNames, Unresolved};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Runs checks with a fixed set of reserved names
#[derive(Debug, Clone, Default)]
pub struct Checker {
    reserved: ReservedNames,
}

impl Checker {
    pub fn new(reserved: ReservedNames) -> Self {
        Checker { reserved }
    }

    pub fn reserved(&self) -> &ReservedNames {
        &self.reserved
    }

    /// Extract then validate a single expression
    pub fn check_expression(&self, expression: &str, parameters: &ParameterSet) -> Vec<Unresolved> {
        validate(crate::extract::extract_identifiers(expression), parameters, &self.reserved)
    }

    /// Check every expression attribute of one operation
    pub fn check_operation(&self, operation: &CacheOperation, method: &Method, sink: &mut dyn DiagnosticSink) {
        for (attribute, expression) in operation.expressions() {
            if expression.is_empty() {
                continue;
            }
            let tokens: Vec<_> = identifier_tokens(expression.as_str()).collect();
            let unresolved = validate(tokens.iter().map(|t| t.name), &method.parameters, &self.reserved);
            trace!(
                method = %method.name,
                %attribute,
                identifiers = tokens.len(),
                unresolved = unresolved.len(),
                "checked expression"
            );
            for miss in unresolved {
                let token = &tokens[miss.index];
                sink.report(Diagnostic::UnresolvedReference(Violation {
                    identifier: miss.identifier,
                    attribute,
                    annotation_kind: operation.kind(),
                    annotation: operation.to_string(),
                    method: method.signature.clone(),
                    expression: expression.as_str().to_string(),
                    span: token.span(),
                    location: method.location.clone(),
                }));
            }
        }
    }

    pub fn check_annotation(&self, annotation: &Annotation, method: &Method, sink: &mut dyn DiagnosticSink) {
        match annotation {
            Annotation::Operation(operation) => self.check_operation(operation, method, sink),
            Annotation::Caching(group) => {
                for operation in group.operations() {
                    self.check_operation(operation, method, sink);
                }
            }
        }
    }

    pub fn check_method(&self, method: &Method, sink: &mut dyn DiagnosticSink) {
        debug!(
            method = %method.name,
            annotations = method.annotations.len(),
            parameters = method.parameters.len(),
            "checking method"
        );
        for annotation in &method.annotations {
            self.check_annotation(annotation, method, sink);
        }
    }

    pub fn check_element(&self, element: &AnnotatedElement, sink: &mut dyn DiagnosticSink) {
        match element {
            AnnotatedElement::Method(method) => self.check_method(method, sink),
            AnnotatedElement::Other { description, location, .. } => {
                debug!(element = %description, "cache annotation on non-method element");
                sink.report(Diagnostic::NotAMethod {
                    element: description.clone(),
                    location: location.clone(),
                });
            }
        }
    }

    pub fn check_all(&self, elements: &[AnnotatedElement], sink: &mut dyn DiagnosticSink) {
        for element in elements {
            self.check_element(element, sink);
        }
    }

    /// Check everything `source` reports for any cache annotation kind
    pub fn check_source<S: ElementSource + ?Sized>(&self, source: &S, sink: &mut dyn DiagnosticSink) {
        self.check_all(&source.annotated_elements(&AnnotationKind::ALL), sink);
    }

    /// Check elements on the current rayon pool.
    ///
    /// Each element is checked independently; results are concatenated in
    /// input order.
    pub fn check_all_parallel(&self, elements: &[AnnotatedElement]) -> Vec<Diagnostic> {
        elements
            .par_iter()
            .map(|element| {
                let mut found = Vec::new();
                self.check_element(element, &mut found);
                found
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Check `elements` with the default reserved names
pub fn check(elements: &[AnnotatedElement]) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    Checker::default().check_all(elements, &mut found);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, Caching, ExprAttribute};
    use crate::diagnostic::SharedSink;
    use crate::element::Location;

    fn op(kind: AnnotationKind, attrs: &[(ExprAttribute, &str)]) -> CacheOperation {
        let mut op = CacheOperation::new(kind).unwrap();
        for (attr, expr) in attrs {
            op.set_expression(*attr, *expr).unwrap();
        }
        op
    }

    fn method(name: &str, params: &[&str]) -> Method {
        let signature = format!("() {}({})", name, params.join(", "));
        Method::new(name, signature, params.iter().copied().collect())
    }

    fn identifiers(found: &[Diagnostic]) -> Vec<(&str, ExprAttribute)> {
        found
            .iter()
            .filter_map(Diagnostic::violation)
            .map(|v| (v.identifier.as_str(), v.attribute))
            .collect()
    }

    #[test]
    fn test_cacheable_key_typo() {
        let m = method("get_entity", &["id"]).with_annotation(op(
            AnnotationKind::Cacheable,
            &[(ExprAttribute::Key, "#id_author"), (ExprAttribute::Unless, "#result==null")],
        ));
        let found = check(&[m.into()]);
        assert_eq!(identifiers(&found), vec![("id_author", ExprAttribute::Key)]);
        let v = found[0].violation().unwrap();
        assert_eq!(v.span, 0..10);
        assert_eq!(v.annotation_kind, AnnotationKind::Cacheable);
    }

    #[test]
    fn test_caching_group_children() {
        let mut group = Caching::default();
        group.push(op(AnnotationKind::CacheEvict, &[(ExprAttribute::Key, "#id")]));
        group.push(op(AnnotationKind::CachePut, &[(ExprAttribute::Key, "#missing")]));
        let m = method("update", &["id"]).with_annotation(group);

        let found = check(&[m.into()]);
        assert_eq!(identifiers(&found), vec![("missing", ExprAttribute::Key)]);
        assert_eq!(found[0].violation().unwrap().annotation_kind, AnnotationKind::CachePut);
    }

    #[test]
    fn test_empty_expressions_are_clean() {
        let m = method("nothing", &[])
            .with_annotation(op(AnnotationKind::Cacheable, &[]))
            .with_annotation(op(AnnotationKind::CacheEvict, &[(ExprAttribute::Key, "")]));
        assert!(check(&[m.into()]).is_empty());
    }

    #[test]
    fn test_every_attribute_is_checked() {
        let m = method("save", &["entity"]).with_annotation(op(
            AnnotationKind::CachePut,
            &[
                (ExprAttribute::Key, "#entity.id"),
                (ExprAttribute::Condition, "#entitty != null"),
                (ExprAttribute::Unless, "#reslt == null"),
            ],
        ));
        let found = check(&[m.into()]);
        assert_eq!(
            identifiers(&found),
            vec![("entitty", ExprAttribute::Condition), ("reslt", ExprAttribute::Unless)]
        );
    }

    #[test]
    fn test_repeated_miss_reported_per_occurrence() {
        let m = method("find", &["id"]).with_annotation(op(
            AnnotationKind::Cacheable,
            &[(ExprAttribute::Key, "#qty + #id + #qty")],
        ));
        let found = check(&[m.into()]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].violation().unwrap().span, 0..4);
        assert_eq!(found[1].violation().unwrap().span, 13..17);
    }

    #[test]
    fn test_non_method_element() {
        let element = AnnotatedElement::Other {
            description: "struct Author".to_string(),
            kinds: vec![AnnotationKind::CachePut],
            location: Some(Location::new(None, 4, 0)),
        };
        let found = check(&[element]);
        assert_eq!(found.len(), 1);
        assert!(matches!(&found[0], Diagnostic::NotAMethod { element, .. } if element == "struct Author"));
    }

    #[test]
    fn test_batch_reporting_continues() {
        let elements = vec![
            AnnotatedElement::Other {
                description: "const LIMIT".to_string(),
                kinds: vec![AnnotationKind::Cacheable],
                location: None,
            },
            method("a", &[]).with_annotation(op(AnnotationKind::Cacheable, &[(ExprAttribute::Key, "#x")])).into(),
            method("b", &[]).with_annotation(op(AnnotationKind::CacheEvict, &[(ExprAttribute::Condition, "#y")])).into(),
        ];
        assert_eq!(check(&elements).len(), 3);
    }

    #[test]
    fn test_extra_reserved_names() {
        let checker = Checker::new(ReservedNames::with_extra(["args"]));
        let m = method("f", &[]).with_annotation(op(AnnotationKind::Cacheable, &[(ExprAttribute::Key, "#args[0]")]));
        let mut found = Vec::new();
        checker.check_method(&m, &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let elements: Vec<AnnotatedElement> = (0..32)
            .map(|i| {
                method(&format!("m{}", i), &["id"])
                    .with_annotation(op(AnnotationKind::Cacheable, &[(ExprAttribute::Key, "#id + #nope")]))
                    .into()
            })
            .collect();
        let checker = Checker::default();
        let parallel = checker.check_all_parallel(&elements);
        assert_eq!(parallel, check(&elements));
        assert_eq!(parallel.len(), 32);
    }

    #[test]
    fn test_shared_sink() {
        let m = method("f", &[]).with_annotation(op(AnnotationKind::CachePut, &[(ExprAttribute::Key, "#a")]));
        let mut sink = SharedSink::new();
        Checker::default().check_method(&m, &mut sink);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_check_source_skips_unannotated() {
        let elements = vec![
            AnnotatedElement::Method(method("plain", &[])),
            AnnotatedElement::Method(
                method("f", &[]).with_annotation(op(AnnotationKind::CacheEvict, &[(ExprAttribute::Key, "#gone")])),
            ),
        ];
        let mut found = Vec::new();
        Checker::default().check_source(elements.as_slice(), &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation().map(|v| v.identifier.as_str()), Some("gone"));
    }

    #[test]
    fn test_check_expression() {
        let params: ParameterSet = ["id", "name"].into_iter().collect();
        let missing = Checker::default().check_expression("#id + #qty + #name + #qty", &params);
        assert_eq!(missing.iter().map(|u| u.index).collect::<Vec<_>>(), vec![1, 3]);
    }
}
