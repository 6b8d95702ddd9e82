//! Implementation of the cache attribute macros
//!
//! Each macro parses its own arguments, checks the expression attributes
//! against the parameters of the function it is attached to, and re-emits
//! the item unchanged. Every finding becomes a `compile_error!` next to it,
//! so a single build reports all of them.

use cache_lint_core::syn_adapter::{describe_item, method_from_signature, parse_annotation};
use cache_lint_core::{AnnotationKind, Checker, Diagnostic, ReservedNames};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Item, ItemFn, Signature, TraitItemFn};

/// Extra reserved names, comma separated, read at expansion time.
///
/// Not part of cargo's rebuild tracking.
pub const RESERVED_ENV: &str = "CACHE_LINT_RESERVED";

/// What the attribute was placed on
enum Target {
    Function(Signature),
    Other(String),
}

fn target_of(input: &TokenStream) -> Target {
    if let Ok(func) = syn::parse2::<ItemFn>(input.clone()) {
        return Target::Function(func.sig);
    }
    // Trait method declaration without a body
    if let Ok(func) = syn::parse2::<TraitItemFn>(input.clone()) {
        return Target::Function(func.sig);
    }
    match syn::parse2::<Item>(input.clone()) {
        Ok(item) => Target::Other(describe_item(&item)),
        Err(_) => Target::Other(input.to_string()),
    }
}

/// Default reserved names plus the comma separated `extra` list
fn parse_reserved(extra: Option<&str>) -> ReservedNames {
    match extra {
        Some(extra) => ReservedNames::with_extra(
            extra
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        ),
        None => ReservedNames::default(),
    }
}

fn reserved_names() -> ReservedNames {
    parse_reserved(std::env::var(RESERVED_ENV).ok().as_deref())
}

/// Expand one cache attribute of `kind`
pub fn process(kind: AnnotationKind, args: TokenStream, input: TokenStream) -> TokenStream {
    let annotation = match parse_annotation(kind, args.clone()) {
        Ok(annotation) => annotation,
        Err(err) => {
            let err = err.to_compile_error();
            return quote! {
                #err
                #input
            };
        }
    };

    let mut found: Vec<Diagnostic> = Vec::new();
    let checker = Checker::new(reserved_names());
    match target_of(&input) {
        Target::Function(sig) => {
            let method = method_from_signature(&sig, None, vec![annotation]);
            checker.check_method(&method, &mut found);
        }
        Target::Other(description) => {
            found.push(Diagnostic::NotAMethod {
                element: description,
                location: None,
            });
        }
    }

    let errors = found.iter().map(|diagnostic| {
        let message = diagnostic.to_string();
        if args.is_empty() {
            syn::Error::new(proc_macro2::Span::call_site(), message).to_compile_error()
        } else {
            syn::Error::new_spanned(&args, message).to_compile_error()
        }
    });

    quote! {
        #(#errors)*
        #input
    }
}
