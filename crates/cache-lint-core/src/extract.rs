//! Identifier extraction for cache expressions
//!
//! Scans an expression string for `#name` variable references and yields the
//! referenced names in order of appearance. The scan is marker-driven and does
//! not parse the expression language:
//! - `#user.id` yields `user` (the token stops at `.`)
//! - `#root.target` yields `root`
//! - a bare `result` without the marker is ignored
//! - a marker not followed by an identifier (`# 1`, `#1a`) is skipped
//!
//! Duplicates are preserved; callers decide whether to dedupe.

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

/// Character that introduces a variable reference inside an expression
pub const MARKER: char = '#';

static REFERENCE_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `#` followed by `[a-zA-Z_$][0-9a-zA-Z_$]*`
fn reference_pattern() -> &'static Regex {
    REFERENCE_PATTERN.get_or_init(|| {
        Regex::new(r"#([a-zA-Z_$][0-9a-zA-Z_$]*)").expect("reference pattern is a valid regex")
    })
}

/// A marker-prefixed reference found in an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierToken<'a> {
    /// Referenced name, without the marker
    pub name: &'a str,
    /// Byte range of `#name` within the expression
    pub start: usize,
    pub end: usize,
}

impl IdentifierToken<'_> {
    /// Byte range of the whole token, marker included
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Iterate over all `#identifier` tokens in `expression`, left to right.
///
/// The iterator is lazy and finite; call again to restart.
pub fn identifier_tokens(expression: &str) -> impl Iterator<Item = IdentifierToken<'_>> + '_ {
    reference_pattern().captures_iter(expression).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(IdentifierToken {
            name: name.as_str(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Names referenced by `expression`, in order, duplicates preserved.
pub fn extract_identifiers(expression: &str) -> impl Iterator<Item = &str> + '_ {
    identifier_tokens(expression).map(|token| token.name)
}

/// Like [`extract_identifiers`], treating an absent expression as empty.
pub fn extract_identifiers_opt(expression: Option<&str>) -> Vec<&str> {
    expression.map(|e| extract_identifiers(e).collect()).unwrap_or_default()
}

/// Raw value of one expression attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Expression(String);

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        Expression(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Referenced identifiers; each call restarts the scan
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        extract_identifiers(&self.0)
    }

    pub fn tokens(&self) -> impl Iterator<Item = IdentifierToken<'_>> + '_ {
        identifier_tokens(&self.0)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(source: &str) -> Self {
        Expression::new(source)
    }
}

impl From<String> for Expression {
    fn from(source: String) -> Self {
        Expression(source)
    }
}
