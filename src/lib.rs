//! # cache-lint
//!
//! Cache Lint: compile-time checking of cache annotation expressions.
//!
//! This crate provides:
//! - `#[cacheable]`, `#[cache_evict]`, `#[cache_put]` and `#[caching]` attribute macros
//! - a compile error for every `#name` in `key`, `condition` or `unless` that is
//!   not a parameter of the annotated function (`#root` and `#result` are reserved)
//! - CLI tool (`cargo cache-lint`) running the same check over a whole workspace
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cache_lint::{cacheable, caching};
//!
//! #[cacheable(value = "AuthorCache", key = "#id", unless = "#result == null")]
//! pub fn get_entity(id: i32) -> Option<AuthorEntity> {
//!     // Implementation...
//! }
//!
//! #[caching(evict(key = "#id"), put(key = "#entity.id"))]
//! pub fn update(id: i32, entity: AuthorEntity) {
//!     // Implementation...
//! }
//! ```
//!
//! A typo such as `key = "#id_author"` fails the build with
//! `Key id_author for annotation ... not found in parameters of method ...`.
//!
//! Extra reserved names can be supplied through `CACHE_LINT_RESERVED`
//! (comma separated) when compiling. The variable is read while the macros
//! expand and cargo does not track it, so crates that are already built keep
//! the old names until they are rebuilt (`cargo clean -p <crate>` or a
//! source change). `cargo cache-lint check --reserved NAME` takes the same
//! names without that caveat.

mod macro_impl;

// Note: Proc-macro crates can only export proc macros, not regular items.
// The checking engine lives in `cache-lint-core`.

use cache_lint_core::AnnotationKind;
use proc_macro::TokenStream;

/// Result caching attribute
///
/// # Parameters
///
/// - `key`: expression computing the cache key
/// - `condition`: expression deciding whether to cache at all
/// - `unless`: expression vetoing the caching of a result
/// - `value` / `cache_names`, `key_generator`, `cache_manager`, `cache_resolver`, `sync`
///
/// # Examples
///
/// ```rust,ignore
/// #[cacheable(key = "#id", condition = "#id > 0")]
/// pub fn find(id: u64) -> Option<Order> {
///     // Implementation...
/// }
/// ```
#[proc_macro_attribute]
pub fn cacheable(args: TokenStream, input: TokenStream) -> TokenStream {
    macro_impl::process(AnnotationKind::Cacheable, args.into(), input.into()).into()
}

/// Cache eviction attribute
///
/// Takes `key` and `condition`; there is no `unless`.
/// Also accepts `all_entries` and `before_invocation`.
#[proc_macro_attribute]
pub fn cache_evict(args: TokenStream, input: TokenStream) -> TokenStream {
    macro_impl::process(AnnotationKind::CacheEvict, args.into(), input.into()).into()
}

/// Cache update attribute
///
/// Takes `key`, `condition` and `unless`, like [`macro@cacheable`].
#[proc_macro_attribute]
pub fn cache_put(args: TokenStream, input: TokenStream) -> TokenStream {
    macro_impl::process(AnnotationKind::CachePut, args.into(), input.into()).into()
}

/// Groups several cache operations on one function
///
/// ```rust,ignore
/// #[caching(cacheable(key = "#id"), evict(key = "#id", all_entries), put(key = "#id"))]
/// pub fn refresh(id: u64) -> Order {
///     // Implementation...
/// }
/// ```
#[proc_macro_attribute]
pub fn caching(args: TokenStream, input: TokenStream) -> TokenStream {
    macro_impl::process(AnnotationKind::Caching, args.into(), input.into()).into()
}
