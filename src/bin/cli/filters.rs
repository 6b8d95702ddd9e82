//! Filtering logic for checking
//!
//! Filters annotated elements by method name

use cache_lint_core::AnnotatedElement;

/// Keep elements whose method name matches `name`.
///
/// Non-method elements are always kept: misuse is reported regardless of filters.
pub fn filter_elements(elements: Vec<AnnotatedElement>, name: Option<&str>) -> Vec<AnnotatedElement> {
    let Some(pattern) = name else {
        return elements;
    };
    elements
        .into_iter()
        .filter(|element| match element {
            AnnotatedElement::Method(method) => matches_name(&method.name, pattern),
            AnnotatedElement::Other { .. } => true,
        })
        .collect()
}

/// Check if function name matches pattern
///
/// `get_*` matches by prefix, `*_entity` by suffix, `*cache*` by substring;
/// a pattern without `*` must match exactly.
pub fn matches_name(function_name: &str, pattern: &str) -> bool {
    let leading = pattern.starts_with('*');
    let trailing = pattern.len() > 1 && pattern.ends_with('*');
    let core = pattern.trim_matches('*');
    match (leading, trailing) {
        (true, true) => function_name.contains(core),
        (true, false) => function_name.ends_with(core),
        (false, true) => function_name.starts_with(core),
        (false, false) => function_name == pattern,
    }
}
