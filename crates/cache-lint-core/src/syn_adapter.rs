//! `syn` host adapter
//!
//! Translates Rust syntax trees into the host-independent model:
//! - attribute arguments into [`Annotation`]s
//! - function signatures into [`ParameterSet`]s and display strings
//! - whole files into [`AnnotatedElement`]s (free fns, impl and trait
//!   methods, inline modules; annotated non-fn items become `Other`)
//!
//! Used by both the attribute macros and the `cargo cache-lint` scanner.

use crate::annotation::{Annotation, AnnotationError, AnnotationKind, CacheOperation, Caching, ExprAttribute};
use crate::element::{AnnotatedElement, ElementSource, Location, Method};
use crate::validate::ParameterSet;
use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use syn::ext::IdentExt;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, FnArg, ImplItem, Item, Lit, Meta, Pat, ReturnType, Signature, Token, TraitItem};

/// Crate name accepted as a path prefix, e.g. `#[cache_lint::cacheable]`
pub const CRATE_PREFIX: &str = "cache_lint";

/// Error covering every token of `tokens`
fn annotation_error<T: ToTokens>(tokens: T, err: AnnotationError) -> syn::Error {
    syn::Error::new_spanned(tokens, err.to_string())
}

fn meta_name(path: &syn::Path) -> syn::Result<String> {
    path.get_ident()
        .map(|ident| ident.unraw().to_string())
        .ok_or_else(|| syn::Error::new_spanned(path, "expected a plain attribute name"))
}

/// Parse `key = "..", condition = "..", ..` for one operation kind
pub fn parse_operation(kind: AnnotationKind, args: TokenStream) -> syn::Result<CacheOperation> {
    let mut operation = CacheOperation::new(kind).map_err(|e| annotation_error(&args, e))?;
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut seen = HashSet::new();

    for meta in metas {
        let name = meta_name(meta.path())?;
        if !seen.insert(name.clone()) {
            return Err(annotation_error(&meta, AnnotationError::DuplicateAttribute { name }));
        }

        match &meta {
            Meta::NameValue(nv) => {
                if let Some(attribute) = ExprAttribute::from_name(&name) {
                    let expression = string_literal(&nv.value)?;
                    operation
                        .set_expression(attribute, expression)
                        .map_err(|e| annotation_error(nv, e))?;
                } else {
                    let rendered = compact(nv.value.to_token_stream().to_string());
                    operation
                        .set_option(&name, rendered)
                        .map_err(|e| annotation_error(&nv.path, e))?;
                }
            }
            // Bare flag: `sync`, `all_entries`
            Meta::Path(path) => {
                if ExprAttribute::from_name(&name).is_some() {
                    return Err(syn::Error::new_spanned(path, format!("`{}` needs a string value", name)));
                }
                operation
                    .set_option(&name, "true")
                    .map_err(|e| annotation_error(path, e))?;
            }
            Meta::List(list) => {
                return Err(syn::Error::new_spanned(
                    list,
                    format!("unexpected nested arguments in #[{}]", kind),
                ));
            }
        }
    }

    Ok(operation)
}

fn string_literal(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            other => Err(syn::Error::new_spanned(other, "expected a string literal")),
        },
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// Parse `cacheable(..), evict(..), put(..)`, each group repeatable
pub fn parse_caching(args: TokenStream) -> syn::Result<Caching> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut group = Caching::default();

    for meta in metas {
        let name = meta_name(meta.path())?;
        let kind = AnnotationKind::from_nested_name(&name)
            .ok_or_else(|| annotation_error(meta.path(), AnnotationError::UnknownGroup { name: name.clone() }))?;
        let tokens = match meta {
            Meta::List(list) => list.tokens,
            Meta::Path(_) => TokenStream::new(),
            Meta::NameValue(nv) => {
                return Err(syn::Error::new_spanned(
                    nv,
                    format!("expected `{}(..)` inside #[caching]", name),
                ));
            }
        };
        group.push(parse_operation(kind, tokens)?);
    }

    Ok(group)
}

/// Parse the arguments of an attribute of `kind`
pub fn parse_annotation(kind: AnnotationKind, args: TokenStream) -> syn::Result<Annotation> {
    if kind.is_grouping() {
        parse_caching(args).map(Annotation::Caching)
    } else {
        parse_operation(kind, args).map(Annotation::Operation)
    }
}

/// Kind of a cache attribute, or `None` for any other attribute
pub fn cache_attribute_kind(attr: &Attribute) -> Option<AnnotationKind> {
    let segments = &attr.path().segments;
    let last = segments.last()?;
    let prefixed = match segments.len() {
        1 => true,
        2 => segments[0].ident == CRATE_PREFIX,
        _ => false,
    };
    if prefixed {
        AnnotationKind::from_attribute_name(&last.ident.to_string())
    } else {
        None
    }
}

/// Parse a cache attribute; `None` when `attr` is not one
pub fn parse_attribute(attr: &Attribute) -> Option<syn::Result<Annotation>> {
    let kind = cache_attribute_kind(attr)?;
    let args = match &attr.meta {
        Meta::Path(_) => TokenStream::new(),
        Meta::List(list) => list.tokens.clone(),
        Meta::NameValue(nv) => {
            return Some(Err(syn::Error::new_spanned(
                nv,
                format!("expected #[{}(..)]", kind),
            )))
        }
    };
    Some(parse_annotation(kind, args))
}

/// Names bound by a parameter pattern; `_` binds nothing
fn collect_bindings(pat: &Pat, out: &mut ParameterSet) {
    match pat {
        Pat::Ident(p) => {
            out.insert(p.ident.unraw().to_string());
            if let Some((_, sub)) = &p.subpat {
                collect_bindings(sub, out);
            }
        }
        Pat::Tuple(t) => t.elems.iter().for_each(|p| collect_bindings(p, out)),
        Pat::TupleStruct(t) => t.elems.iter().for_each(|p| collect_bindings(p, out)),
        Pat::Struct(s) => s.fields.iter().for_each(|f| collect_bindings(&f.pat, out)),
        Pat::Slice(s) => s.elems.iter().for_each(|p| collect_bindings(p, out)),
        Pat::Reference(r) => collect_bindings(&r.pat, out),
        Pat::Paren(p) => collect_bindings(&p.pat, out),
        Pat::Type(t) => collect_bindings(&t.pat, out),
        Pat::Or(o) => {
            if let Some(first) = o.cases.first() {
                collect_bindings(first, out);
            }
        }
        _ => {}
    }
}

/// Parameter names of `sig`, receivers excluded
pub fn parameter_names(sig: &Signature) -> ParameterSet {
    let mut names = ParameterSet::new();
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            collect_bindings(&pat_type.pat, &mut names);
        }
    }
    names
}

/// Tighten `to_string()` output of a token stream for display
fn compact(tokens: String) -> String {
    tokens
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" : ", ": ")
        .replace(" < ", "<")
        .replace("< ", "<")
        .replace(" <", "<")
        .replace(" >", ">")
        .replace("& ", "&")
        .replace(" ,", ",")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
}

/// `ReturnType name(params)`, prefixed with `Owner::` for methods
pub fn render_signature(sig: &Signature, owner: Option<&str>) -> String {
    let ret = match &sig.output {
        ReturnType::Default => "()".to_string(),
        ReturnType::Type(_, ty) => compact(ty.to_token_stream().to_string()),
    };
    let params: Vec<String> = sig
        .inputs
        .iter()
        .map(|input| compact(input.to_token_stream().to_string()))
        .collect();
    let name = match owner {
        Some(owner) => format!("{}::{}", owner, sig.ident),
        None => sig.ident.to_string(),
    };
    format!("{} {}({})", ret, name, params.join(", "))
}

/// Location of `span` in `file`
pub fn location_of(span: Span, file: Option<&Path>) -> Location {
    let start = span.start();
    Location::new(file.map(Path::to_path_buf), start.line, start.column)
}

/// Build a [`Method`] from a signature and its already-parsed annotations
pub fn method_from_signature(sig: &Signature, owner: Option<&str>, annotations: Vec<Annotation>) -> Method {
    let mut method = Method::new(sig.ident.unraw().to_string(), render_signature(sig, owner), parameter_names(sig));
    method.annotations = annotations;
    method
}

/// Short description of a non-fn item, e.g. `struct Author`
pub fn describe_item(item: &Item) -> String {
    match item {
        Item::Const(i) => format!("const {}", i.ident),
        Item::Enum(i) => format!("enum {}", i.ident),
        Item::ExternCrate(i) => format!("extern crate {}", i.ident),
        Item::Fn(i) => format!("fn {}", i.sig.ident),
        Item::ForeignMod(_) => "extern block".to_string(),
        Item::Impl(i) => format!("impl {}", compact(i.self_ty.to_token_stream().to_string())),
        Item::Macro(i) => match &i.ident {
            Some(ident) => format!("macro_rules! {}", ident),
            None => format!("macro invocation {}!", compact(i.mac.path.to_token_stream().to_string())),
        },
        Item::Mod(i) => format!("mod {}", i.ident),
        Item::Static(i) => format!("static {}", i.ident),
        Item::Struct(i) => format!("struct {}", i.ident),
        Item::Trait(i) => format!("trait {}", i.ident),
        Item::TraitAlias(i) => format!("trait alias {}", i.ident),
        Item::Type(i) => format!("type {}", i.ident),
        Item::Union(i) => format!("union {}", i.ident),
        Item::Use(i) => format!("use {}", compact(i.tree.to_token_stream().to_string())),
        other => compact(quote!(#other).to_string()),
    }
}

fn item_attrs(item: &Item) -> &[Attribute] {
    match item {
        Item::Const(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::ExternCrate(i) => &i.attrs,
        Item::Fn(i) => &i.attrs,
        Item::ForeignMod(i) => &i.attrs,
        Item::Impl(i) => &i.attrs,
        Item::Macro(i) => &i.attrs,
        Item::Mod(i) => &i.attrs,
        Item::Static(i) => &i.attrs,
        Item::Struct(i) => &i.attrs,
        Item::Trait(i) => &i.attrs,
        Item::TraitAlias(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

/// An attribute whose arguments could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAnnotation {
    pub message: String,
    pub location: Location,
}

/// Annotated elements found in one source file
#[derive(Debug, Clone, Default)]
pub struct ScannedFile {
    pub path: Option<PathBuf>,
    pub elements: Vec<AnnotatedElement>,
    pub malformed: Vec<MalformedAnnotation>,
}

impl ElementSource for ScannedFile {
    fn annotated_elements(&self, kinds: &[AnnotationKind]) -> Vec<AnnotatedElement> {
        self.elements.annotated_elements(kinds)
    }
}

struct FileScanner<'a> {
    path: Option<&'a Path>,
    out: ScannedFile,
}

impl FileScanner<'_> {
    fn annotations(&mut self, attrs: &[Attribute]) -> Vec<Annotation> {
        let mut found = Vec::new();
        for attr in attrs {
            match parse_attribute(attr) {
                Some(Ok(annotation)) => found.push(annotation),
                Some(Err(err)) => self.out.malformed.push(MalformedAnnotation {
                    message: err.to_string(),
                    location: location_of(err.span(), self.path),
                }),
                None => {}
            }
        }
        found
    }

    fn has_cache_attribute(attrs: &[Attribute]) -> Option<&Attribute> {
        attrs.iter().find(|attr| cache_attribute_kind(attr).is_some())
    }

    fn method(&mut self, attrs: &[Attribute], sig: &Signature, owner: Option<&str>) {
        if Self::has_cache_attribute(attrs).is_none() {
            return;
        }
        let annotations = self.annotations(attrs);
        let method = method_from_signature(sig, owner, annotations)
            .with_location(location_of(sig.ident.span(), self.path));
        self.out.elements.push(AnnotatedElement::Method(method));
    }

    fn other(&mut self, attrs: &[Attribute], description: String) {
        if let Some(attr) = Self::has_cache_attribute(attrs) {
            self.out.elements.push(AnnotatedElement::Other {
                description,
                kinds: attrs.iter().filter_map(cache_attribute_kind).collect(),
                location: Some(location_of(attr.span(), self.path)),
            });
        }
    }

    fn items(&mut self, items: &[Item]) {
        for item in items {
            self.item(item);
        }
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::Fn(func) => self.method(&func.attrs, &func.sig, None),
            Item::Impl(imp) => {
                self.other(&imp.attrs, describe_item(item));
                let owner = compact(imp.self_ty.to_token_stream().to_string());
                for impl_item in &imp.items {
                    match impl_item {
                        ImplItem::Fn(f) => self.method(&f.attrs, &f.sig, Some(owner.as_str())),
                        ImplItem::Const(c) => self.other(&c.attrs, format!("const {}::{}", owner, c.ident)),
                        ImplItem::Type(t) => self.other(&t.attrs, format!("type {}::{}", owner, t.ident)),
                        _ => {}
                    }
                }
            }
            Item::Trait(tr) => {
                self.other(&tr.attrs, describe_item(item));
                let owner = tr.ident.to_string();
                for trait_item in &tr.items {
                    match trait_item {
                        TraitItem::Fn(f) => self.method(&f.attrs, &f.sig, Some(owner.as_str())),
                        TraitItem::Const(c) => self.other(&c.attrs, format!("const {}::{}", owner, c.ident)),
                        TraitItem::Type(t) => self.other(&t.attrs, format!("type {}::{}", owner, t.ident)),
                        _ => {}
                    }
                }
            }
            Item::Mod(module) => {
                self.other(&module.attrs, describe_item(item));
                if let Some((_, items)) = &module.content {
                    self.items(items);
                }
            }
            other => self.other(item_attrs(other), describe_item(other)),
        }
    }
}

/// Collect annotated elements from a parsed file
pub fn scan_file(file: &syn::File, path: Option<&Path>) -> ScannedFile {
    let mut scanner = FileScanner {
        path,
        out: ScannedFile {
            path: path.map(Path::to_path_buf),
            ..ScannedFile::default()
        },
    };
    scanner.items(&file.items);
    scanner.out
}

/// Parse `source` and collect annotated elements
pub fn scan_source(source: &str, path: Option<&Path>) -> syn::Result<ScannedFile> {
    let file = syn::parse_file(source)?;
    Ok(scan_file(&file, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::walker::check;
    use syn::parse_quote;

    fn operation(kind: AnnotationKind, args: TokenStream) -> CacheOperation {
        parse_operation(kind, args).unwrap()
    }

    #[test]
    fn test_parse_cacheable_arguments() {
        let op = operation(
            AnnotationKind::Cacheable,
            quote!(value = "AuthorCache", key = "#id_author", unless = "#result==null"),
        );
        assert_eq!(op.expression(ExprAttribute::Key).unwrap().as_str(), "#id_author");
        assert_eq!(op.expression(ExprAttribute::Unless).unwrap().as_str(), "#result==null");
        assert!(op.expression(ExprAttribute::Condition).unwrap().is_empty());
    }

    #[test]
    fn test_parse_options_and_flags() {
        let op = operation(
            AnnotationKind::CacheEvict,
            quote!(cache_names = ["a", "b"], all_entries, before_invocation = true),
        );
        assert_eq!(op.expressions().count(), 2);
        assert!(op.to_string().contains("all_entries = true"));
    }

    #[test]
    fn test_parse_rejects_unless_on_evict() {
        let err = parse_operation(AnnotationKind::CacheEvict, quote!(unless = "#x")).unwrap_err();
        assert!(err.to_string().contains("has no `unless`"));
    }

    #[test]
    fn test_parse_rejects_unknown_and_duplicate() {
        assert!(parse_operation(AnnotationKind::Cacheable, quote!(keys = "#x")).is_err());
        assert!(parse_operation(AnnotationKind::Cacheable, quote!(key = "#x", key = "#y")).is_err());
        assert!(parse_operation(AnnotationKind::Cacheable, quote!(key = 5)).is_err());
    }

    #[test]
    fn test_parse_caching_groups() {
        let group = parse_caching(quote!(
            evict(key = "#id"),
            put(key = "#missing"),
            put(key = "#id", condition = "#id > 0")
        ))
        .unwrap();
        assert_eq!(group.evict.len(), 1);
        assert_eq!(group.put.len(), 2);
        assert!(group.cacheable.is_empty());
    }

    #[test]
    fn test_parse_caching_rejects_unknown_group() {
        let err = parse_caching(quote!(caching(key = "#id"))).unwrap_err();
        assert!(err.to_string().contains("unknown group"));
    }

    #[test]
    fn test_attribute_recognition() {
        let plain: Attribute = parse_quote!(#[cacheable(key = "#id")]);
        let prefixed: Attribute = parse_quote!(#[cache_lint::cache_put(key = "#id")]);
        let foreign: Attribute = parse_quote!(#[other::cacheable(key = "#id")]);
        let unrelated: Attribute = parse_quote!(#[inline]);
        assert_eq!(cache_attribute_kind(&plain), Some(AnnotationKind::Cacheable));
        assert_eq!(cache_attribute_kind(&prefixed), Some(AnnotationKind::CachePut));
        assert_eq!(cache_attribute_kind(&foreign), None);
        assert!(parse_attribute(&unrelated).is_none());

        let bare: Attribute = parse_quote!(#[cacheable]);
        assert!(matches!(parse_attribute(&bare), Some(Ok(Annotation::Operation(_)))));
    }

    #[test]
    fn test_parameter_names() {
        let sig: Signature = parse_quote!(fn f(&self, id: u32, (a, b): (u8, u8), _: bool, r#type: &str, mut n: i64));
        let names: Vec<_> = parameter_names(&sig).iter().map(str::to_string).collect();
        assert_eq!(names, vec!["id", "a", "b", "type", "n"]);
    }

    #[test]
    fn test_render_signature() {
        let sig: Signature = parse_quote!(fn get_entity(id: Option<i32>) -> Option<AuthorEntity>);
        assert_eq!(
            render_signature(&sig, None),
            "Option<AuthorEntity> get_entity(id: Option<i32>)"
        );
        let sig: Signature = parse_quote!(fn update(&self, id: u32));
        assert_eq!(render_signature(&sig, Some("Repo")), "() Repo::update(&self, id: u32)");
    }

    #[test]
    fn test_scan_file_finds_methods_and_misuse() {
        let source = r##"
            #[cacheable(key = "#id_author", unless = "#result==null")]
            pub fn get_entity(id: i32) -> Option<AuthorEntity> { None }

            #[cacheable(key = "#id")]
            pub struct Author;

            impl Repo {
                #[caching(evict(key = "#id"), put(key = "#missing"))]
                pub fn update(&mut self, id: i32) {}

                pub fn untouched(&self) {}
            }

            trait Store {
                #[cache_evict(condition = "#key != null")]
                fn remove(&self, key: &str);
            }

            mod inner {
                #[cache_put(key = "#nope")]
                fn save(entity: Entity) {}
            }
        "##;
        let scanned = scan_source(source, Some(Path::new("src/repo.rs"))).unwrap();
        assert!(scanned.malformed.is_empty());
        assert_eq!(scanned.elements.len(), 5);
        assert!(matches!(
            &scanned.elements[1],
            AnnotatedElement::Other { kinds, .. } if kinds == &[AnnotationKind::Cacheable]
        ));
        assert_eq!(scanned.annotated_elements(&[AnnotationKind::CachePut]).len(), 1);
        assert_eq!(scanned.annotated_elements(&[AnnotationKind::Cacheable]).len(), 2);

        let found = check(&scanned.elements);
        let messages: Vec<String> = found.iter().map(|d| d.to_string()).collect();
        assert_eq!(found.len(), 4, "{:#?}", messages);
        assert!(messages[0].starts_with("Key id_author for annotation"));
        assert!(messages[0].ends_with("of method Option<AuthorEntity> get_entity(id: i32)"));
        assert!(matches!(&found[1], Diagnostic::NotAMethod { element, .. } if element == "struct Author"));
        assert!(messages[2].starts_with("Key missing"));
        assert!(messages[2].contains("Repo::update"));
        assert!(messages[3].starts_with("Key nope"));

        let location = found[0].location().unwrap();
        assert_eq!(location.line, 3);
        assert_eq!(location.file.as_deref(), Some(Path::new("src/repo.rs")));
    }

    #[test]
    fn test_scan_file_reports_malformed_arguments() {
        let scanned = scan_source(
            r##"
            #[cache_evict(key = "#id", unless = "#result")]
            fn drop_it(id: u32) {}
            "##,
            None,
        )
        .unwrap();
        assert_eq!(scanned.malformed.len(), 1);
        assert_eq!(scanned.malformed[0].location.line, 2);
        assert_eq!(scanned.elements.len(), 1);
    }
}
