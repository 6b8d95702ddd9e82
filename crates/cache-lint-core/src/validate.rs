//! Reference validation
//!
//! Classifies extracted identifiers as resolved (a reserved name or a
//! declared parameter) or unresolved. Every unresolved occurrence is
//! reported, in input order.

use std::collections::HashSet;

/// Names supplied by the evaluation context rather than by parameters
pub const DEFAULT_RESERVED: [&str; 2] = ["root", "result"];

/// Declared parameter names of the method under check
///
/// Keeps declaration order for display; membership is by exact name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    ordered: Vec<String>,
    names: HashSet<String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name; a repeated name is kept once
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.names.insert(name.clone()) {
            self.ordered.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// Identifiers that always resolve, regardless of the parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedNames {
    names: HashSet<String>,
}

impl ReservedNames {
    /// An empty set; nothing is implicitly resolved
    pub fn none() -> Self {
        ReservedNames { names: HashSet::new() }
    }

    /// Default set extended with `extra`
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved = Self::default();
        reserved.names.extend(extra.into_iter().map(Into::into));
        reserved
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        ReservedNames {
            names: DEFAULT_RESERVED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// An identifier that matched neither a reserved name nor a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub identifier: String,
    /// Position in the identifier sequence handed to [`validate`]
    pub index: usize,
}

/// Report every identifier absent from both `reserved` and `parameters`.
///
/// Order follows the input; repeated unresolved identifiers are each reported.
pub fn validate<I, S>(identifiers: I, parameters: &ParameterSet, reserved: &ReservedNames) -> Vec<Unresolved>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    identifiers
        .into_iter()
        .enumerate()
        .filter_map(|(index, identifier)| {
            let identifier = identifier.as_ref();
            if reserved.contains(identifier) || parameters.contains(identifier) {
                None
            } else {
                Some(Unresolved {
                    identifier: identifier.to_string(),
                    index,
                })
            }
        })
        .collect()
}
