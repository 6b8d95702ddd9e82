//! Cache annotation model
//!
//! A closed set of annotation kinds with a per-kind table of the
//! expression-valued attributes each one carries:
//!
//! | kind          | key | condition | unless |
//! |---------------|-----|-----------|--------|
//! | `cacheable`   |  x  |     x     |   x    |
//! | `cache_evict` |  x  |     x     |        |
//! | `cache_put`   |  x  |     x     |   x    |
//! | `caching`     | groups the three kinds above, one level deep |

use crate::extract::Expression;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Annotation kinds understood by the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Cacheable,
    CacheEvict,
    CachePut,
    Caching,
}

/// Expression-valued attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprAttribute {
    Key,
    Condition,
    Unless,
}

const OPERATION_WITH_UNLESS: &[ExprAttribute] =
    &[ExprAttribute::Key, ExprAttribute::Condition, ExprAttribute::Unless];
const OPERATION_WITHOUT_UNLESS: &[ExprAttribute] = &[ExprAttribute::Key, ExprAttribute::Condition];

const COMMON_OPTIONS: &[&str] = &["value", "cache_names", "key_generator", "cache_manager", "cache_resolver"];
const CACHEABLE_OPTIONS: &[&str] = &["value", "cache_names", "key_generator", "cache_manager", "cache_resolver", "sync"];
const EVICT_OPTIONS: &[&str] = &[
    "value",
    "cache_names",
    "key_generator",
    "cache_manager",
    "cache_resolver",
    "all_entries",
    "before_invocation",
];

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::Cacheable,
        AnnotationKind::CacheEvict,
        AnnotationKind::CachePut,
        AnnotationKind::Caching,
    ];

    /// Attribute macro name, e.g. `cache_evict`
    pub fn attribute_name(self) -> &'static str {
        match self {
            AnnotationKind::Cacheable => "cacheable",
            AnnotationKind::CacheEvict => "cache_evict",
            AnnotationKind::CachePut => "cache_put",
            AnnotationKind::Caching => "caching",
        }
    }

    pub fn from_attribute_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.attribute_name() == name)
    }

    /// Name of the child list inside `caching(..)`; `None` for the grouping kind
    pub fn nested_name(self) -> Option<&'static str> {
        match self {
            AnnotationKind::Cacheable => Some("cacheable"),
            AnnotationKind::CacheEvict => Some("evict"),
            AnnotationKind::CachePut => Some("put"),
            AnnotationKind::Caching => None,
        }
    }

    pub fn from_nested_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.nested_name() == Some(name))
    }

    /// Expression attributes defined for this kind
    pub fn expression_attributes(self) -> &'static [ExprAttribute] {
        match self {
            AnnotationKind::Cacheable | AnnotationKind::CachePut => OPERATION_WITH_UNLESS,
            AnnotationKind::CacheEvict => OPERATION_WITHOUT_UNLESS,
            AnnotationKind::Caching => &[],
        }
    }

    /// Non-expression attributes accepted (and ignored) for this kind
    pub fn option_attributes(self) -> &'static [&'static str] {
        match self {
            AnnotationKind::Cacheable => CACHEABLE_OPTIONS,
            AnnotationKind::CacheEvict => EVICT_OPTIONS,
            AnnotationKind::CachePut => COMMON_OPTIONS,
            AnnotationKind::Caching => &[],
        }
    }

    pub fn supports(self, attribute: ExprAttribute) -> bool {
        self.expression_attributes().contains(&attribute)
    }

    pub fn is_grouping(self) -> bool {
        self == AnnotationKind::Caching
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

impl ExprAttribute {
    pub const ALL: [ExprAttribute; 3] = [ExprAttribute::Key, ExprAttribute::Condition, ExprAttribute::Unless];

    pub fn name(self) -> &'static str {
        match self {
            ExprAttribute::Key => "key",
            ExprAttribute::Condition => "condition",
            ExprAttribute::Unless => "unless",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }
}

impl fmt::Display for ExprAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors building an annotation from its arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("unknown attribute `{name}` for #[{kind}]")]
    UnknownAttribute { kind: AnnotationKind, name: String },
    #[error("#[{kind}] has no `{attribute}` attribute")]
    UnsupportedExpression { kind: AnnotationKind, attribute: ExprAttribute },
    #[error("attribute `{name}` given more than once")]
    DuplicateAttribute { name: String },
    #[error("unknown group `{name}` in #[caching], expected `cacheable`, `evict` or `put`")]
    UnknownGroup { name: String },
    #[error("#[caching] cannot be used as a single cache operation")]
    GroupingAsOperation,
}

/// One `cacheable`, `cache_evict` or `cache_put` instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOperation {
    kind: AnnotationKind,
    key: Expression,
    condition: Expression,
    unless: Expression,
    options: Vec<(String, String)>,
}

impl CacheOperation {
    /// New instance with every expression attribute unset (empty)
    pub fn new(kind: AnnotationKind) -> Result<Self, AnnotationError> {
        if kind.is_grouping() {
            return Err(AnnotationError::GroupingAsOperation);
        }
        Ok(CacheOperation {
            kind,
            key: Expression::default(),
            condition: Expression::default(),
            unless: Expression::default(),
            options: Vec::new(),
        })
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Set an expression attribute, rejecting ones the kind does not define
    pub fn set_expression(&mut self, attribute: ExprAttribute, expression: impl Into<Expression>) -> Result<(), AnnotationError> {
        if !self.kind.supports(attribute) {
            return Err(AnnotationError::UnsupportedExpression {
                kind: self.kind,
                attribute,
            });
        }
        let slot = match attribute {
            ExprAttribute::Key => &mut self.key,
            ExprAttribute::Condition => &mut self.condition,
            ExprAttribute::Unless => &mut self.unless,
        };
        *slot = expression.into();
        Ok(())
    }

    /// Builder form of [`CacheOperation::set_expression`]
    pub fn with(mut self, attribute: ExprAttribute, expression: impl Into<Expression>) -> Result<Self, AnnotationError> {
        self.set_expression(attribute, expression)?;
        Ok(self)
    }

    /// Record a non-expression attribute for display
    pub fn set_option(&mut self, name: &str, rendered: impl Into<String>) -> Result<(), AnnotationError> {
        if !self.kind.option_attributes().contains(&name) {
            return Err(AnnotationError::UnknownAttribute {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.options.push((name.to_string(), rendered.into()));
        Ok(())
    }

    /// Value of `attribute`, or `None` when the kind does not define it
    pub fn expression(&self, attribute: ExprAttribute) -> Option<&Expression> {
        if !self.kind.supports(attribute) {
            return None;
        }
        Some(match attribute {
            ExprAttribute::Key => &self.key,
            ExprAttribute::Condition => &self.condition,
            ExprAttribute::Unless => &self.unless,
        })
    }

    /// Every expression attribute defined for the kind, set or not
    pub fn expressions(&self) -> impl Iterator<Item = (ExprAttribute, &Expression)> + '_ {
        self.kind
            .expression_attributes()
            .iter()
            .filter_map(move |&attr| self.expression(attr).map(|expr| (attr, expr)))
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#[{}(", self.kind)?;
        let mut first = true;
        for (name, value) in &self.options {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, value)?;
            first = false;
        }
        for (attr, expr) in self.expressions() {
            if expr.is_empty() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{} = {:?}", attr, expr.as_str())?;
            first = false;
        }
        f.write_str(")]")
    }
}

/// A `caching` instance grouping repeated operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caching {
    pub cacheable: Vec<CacheOperation>,
    pub evict: Vec<CacheOperation>,
    pub put: Vec<CacheOperation>,
}

impl Caching {
    /// Append a child to the list matching its kind
    pub fn push(&mut self, operation: CacheOperation) {
        match operation.kind() {
            AnnotationKind::Cacheable => self.cacheable.push(operation),
            AnnotationKind::CacheEvict => self.evict.push(operation),
            AnnotationKind::CachePut => self.put.push(operation),
            // CacheOperation::new rejects the grouping kind
            AnnotationKind::Caching => {}
        }
    }

    /// Children in group order: cacheable, evict, put
    pub fn operations(&self) -> impl Iterator<Item = &CacheOperation> + '_ {
        self.cacheable.iter().chain(&self.evict).chain(&self.put)
    }

    pub fn is_empty(&self) -> bool {
        self.cacheable.is_empty() && self.evict.is_empty() && self.put.is_empty()
    }
}

impl fmt::Display for Caching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#[caching({} cacheable, {} evict, {} put)]",
            self.cacheable.len(),
            self.evict.len(),
            self.put.len()
        )
    }
}

/// One annotation instance attached to an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Operation(CacheOperation),
    Caching(Caching),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Operation(op) => op.kind(),
            Annotation::Caching(_) => AnnotationKind::Caching,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Operation(op) => op.fmt(f),
            Annotation::Caching(group) => group.fmt(f),
        }
    }
}

impl From<CacheOperation> for Annotation {
    fn from(op: CacheOperation) -> Self {
        Annotation::Operation(op)
    }
}

impl From<Caching> for Annotation {
    fn from(group: Caching) -> Self {
        Annotation::Caching(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_table() {
        assert_eq!(AnnotationKind::Cacheable.expression_attributes().len(), 3);
        assert_eq!(AnnotationKind::CachePut.expression_attributes().len(), 3);
        assert!(!AnnotationKind::CacheEvict.supports(ExprAttribute::Unless));
        assert!(AnnotationKind::Caching.expression_attributes().is_empty());
    }

    #[test]
    fn test_names_round_trip() {
        for kind in AnnotationKind::ALL {
            assert_eq!(AnnotationKind::from_attribute_name(kind.attribute_name()), Some(kind));
        }
        assert_eq!(AnnotationKind::from_nested_name("evict"), Some(AnnotationKind::CacheEvict));
        assert_eq!(AnnotationKind::from_nested_name("caching"), None);
        assert_eq!(ExprAttribute::from_name("unless"), Some(ExprAttribute::Unless));
    }

    #[test]
    fn test_evict_rejects_unless() {
        let mut op = CacheOperation::new(AnnotationKind::CacheEvict).unwrap();
        let err = op.set_expression(ExprAttribute::Unless, "#result == null").unwrap_err();
        assert_eq!(
            err,
            AnnotationError::UnsupportedExpression {
                kind: AnnotationKind::CacheEvict,
                attribute: ExprAttribute::Unless,
            }
        );
        assert!(op.expression(ExprAttribute::Unless).is_none());
        assert_eq!(op.expressions().count(), 2);
    }

    #[test]
    fn test_grouping_is_not_an_operation() {
        assert_eq!(
            CacheOperation::new(AnnotationKind::Caching).unwrap_err(),
            AnnotationError::GroupingAsOperation
        );
    }

    #[test]
    fn test_unset_expressions_default_to_empty() {
        let op = CacheOperation::new(AnnotationKind::Cacheable).unwrap();
        assert!(op.expressions().all(|(_, expr)| expr.is_empty()));
    }

    #[test]
    fn test_option_attributes_per_kind() {
        let mut put = CacheOperation::new(AnnotationKind::CachePut).unwrap();
        assert!(put.set_option("value", "\"authors\"").is_ok());
        assert!(put.set_option("all_entries", "true").is_err());

        let mut evict = CacheOperation::new(AnnotationKind::CacheEvict).unwrap();
        assert!(evict.set_option("all_entries", "true").is_ok());
    }

    #[test]
    fn test_display() {
        let mut op = CacheOperation::new(AnnotationKind::Cacheable)
            .unwrap()
            .with(ExprAttribute::Key, "#id_author")
            .unwrap()
            .with(ExprAttribute::Unless, "#result==null")
            .unwrap();
        op.set_option("value", "\"AuthorCache\"").unwrap();
        assert_eq!(
            op.to_string(),
            r##"#[cacheable(value = "AuthorCache", key = "#id_author", unless = "#result==null")]"##
        );
    }

    #[test]
    fn test_caching_push_routes_by_kind() {
        let mut group = Caching::default();
        group.push(CacheOperation::new(AnnotationKind::CachePut).unwrap());
        group.push(CacheOperation::new(AnnotationKind::CacheEvict).unwrap());
        assert_eq!(group.put.len(), 1);
        assert_eq!(group.evict.len(), 1);
        let kinds: Vec<_> = group.operations().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec![AnnotationKind::CacheEvict, AnnotationKind::CachePut]);
    }
}
