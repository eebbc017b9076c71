//! Rust backend
//!
//! For an interface `List<T>` this emits:
//!
//! - `ListData<'a>`: an erased `&'a mut` to some concrete value,
//! - `ListImpl<T>`: the trait a concrete type implements,
//! - `ListVTable<T>`: one `unsafe fn` pointer per operation,
//! - `ListVTableFor<T, M>`: the per-type holder whose `TABLE` constant is
//!   built from forwarding thunks,
//! - `List<'a, T>`: the handle, and `make_list` to build one.
//!
//! Items are built with [`quote`], re-parsed with [`syn`] and formatted with
//! [`prettyplease`]. Namespaces become nested `pub mod` blocks.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::Ident;

use super::{Backend, Fragment, FragmentKind, GenerateOptions, Target};
use crate::check::CheckDiagnostic;
use crate::error::EmissionError;
use crate::model::{BindingMode, GenericParam, InterfaceSpec, OperationSpec};
use crate::types::{is_identifier, TypeArg, TypeExpr};

/// Handle methods the generated code defines itself.
pub const RESERVED_HANDLE_METHODS: &[&str] =
    &["vtable", "same_type", "from_raw_parts", "from_vtable", "_marker"];

/// Items of the `VTableFor<M>` holder impl, which also holds one thunk per
/// operation.
pub const RESERVED_HOLDER_ITEMS: &[&str] = &["TABLE"];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Generic kinds that name a value type rather than a trait bound.
const CONST_KINDS: &[&str] = &[
    "int", "unsigned", "long", "short", "char", "bool", "size_t", "i8", "i16", "i32", "i64",
    "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

const C_WORDS: &[&str] = &[
    "unsigned", "signed", "short", "long", "int", "char", "float", "double",
];

pub struct RustBackend;

impl Backend for RustBackend {
    fn target(&self) -> Target {
        Target::Rust
    }

    fn check(&self, spec: &InterfaceSpec) -> Vec<CheckDiagnostic> {
        check_rust(spec)
    }

    fn emit(
        &self,
        spec: &InterfaceSpec,
        options: &GenerateOptions,
    ) -> Result<Vec<Fragment>, EmissionError> {
        Shim::new(spec)?.fragments(options)
    }
}

// ── Type rendering ───────────────────────────────────────────────────────────

/// Render a type token as Rust source text. References are given `lifetime`
/// (e.g. `'r`) when set and left elided otherwise.
pub fn rust_type_str(ty: &TypeExpr, lifetime: Option<&str>) -> Result<String, EmissionError> {
    match ty {
        TypeExpr::Unit => Ok("()".to_string()),
        TypeExpr::Ref { mutable, inner } => {
            let inner = rust_type_str(inner, lifetime)?;
            let lt = lifetime.map(|l| format!("{l} ")).unwrap_or_default();
            let m = if *mutable { "mut " } else { "" };
            Ok(format!("&{lt}{m}{inner}"))
        }
        TypeExpr::Ptr { mutable, inner } => {
            let pointee = if inner.is_unit() {
                "::core::ffi::c_void".to_string()
            } else {
                rust_type_str(inner, lifetime)?
            };
            let m = if *mutable { "mut" } else { "const" };
            Ok(format!("*{m} {pointee}"))
        }
        TypeExpr::Named { path, args } => {
            if path.len() == 1 && args.is_empty() {
                if let Some(mapped) = c_primitive(&path[0]) {
                    return mapped.map(str::to_string).map_err(|reason| unrenderable(ty, reason));
                }
                if let Some(mapped) = c_typedef(&path[0]) {
                    return Ok(mapped.to_string());
                }
            }
            if path.len() == 2 && path[0] == "std" && args.is_empty() {
                if let Some(mapped) = c_typedef(&path[1]) {
                    return Ok(mapped.to_string());
                }
            }
            if let Some(word) = path.iter().find(|seg| seg.contains(' ')) {
                return Err(unrenderable(ty, format!("'{word}' is not a Rust path segment")));
            }

            let mut out = path.join("::");
            if !args.is_empty() {
                let rendered = args
                    .iter()
                    .map(|a| match a {
                        TypeArg::Type(t) => rust_type_str(t, lifetime),
                        TypeArg::Const(c) => Ok(c.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                out.push('<');
                out.push_str(&rendered.join(", "));
                out.push('>');
            }
            Ok(out)
        }
    }
}

/// [`rust_type_str`], parsed.
pub fn rust_type(ty: &TypeExpr, lifetime: Option<&str>) -> Result<syn::Type, EmissionError> {
    let text = rust_type_str(ty, lifetime)?;
    syn::parse_str::<syn::Type>(&text).map_err(|e| unrenderable(ty, e.to_string()))
}

fn unrenderable(ty: &TypeExpr, reason: impl Into<String>) -> EmissionError {
    EmissionError::UnrenderableType {
        token: ty.to_string(),
        target: "rust",
        reason: reason.into(),
    }
}

/// Map a (possibly multi-word) C primitive. `None` if `name` is not one.
fn c_primitive(name: &str) -> Option<Result<&'static str, String>> {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.is_empty() || !words.iter().all(|w| C_WORDS.contains(w)) {
        return None;
    }
    let unsigned = words.contains(&"unsigned");
    let signed = words.contains(&"signed");
    let mut core: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !matches!(*w, "signed" | "unsigned"))
        .collect();
    if core.len() > 1 {
        core.retain(|w| *w != "int");
    }

    let mapped = match (core.as_slice(), unsigned) {
        ([] | ["int"], false) => "i32",
        ([] | ["int"], true) => "u32",
        (["short"], false) => "i16",
        (["short"], true) => "u16",
        (["long"] | ["long", "long"], false) => "i64",
        (["long"] | ["long", "long"], true) => "u64",
        (["char"], true) => "u8",
        (["char"], false) if signed => "i8",
        (["char"], false) => "::core::ffi::c_char",
        (["float"], false) => "f32",
        (["double"], false) => "f64",
        _ => return Some(Err(format!("no Rust equivalent for C type '{name}'"))),
    };
    Some(Ok(mapped))
}

/// Common C typedefs with a fixed Rust spelling.
fn c_typedef(name: &str) -> Option<&'static str> {
    Some(match name {
        "size_t" => "usize",
        "ssize_t" | "ptrdiff_t" | "intptr_t" => "isize",
        "uintptr_t" => "usize",
        "int8_t" => "i8",
        "int16_t" => "i16",
        "int32_t" => "i32",
        "int64_t" => "i64",
        "uint8_t" => "u8",
        "uint16_t" => "u16",
        "uint32_t" => "u32",
        "uint64_t" => "u64",
        _ => return None,
    })
}

fn ident(name: &str) -> Result<Ident, EmissionError> {
    if is_identifier(name) && !RUST_KEYWORDS.contains(&name) {
        Ok(Ident::new(name, Span::call_site()))
    } else {
        Err(EmissionError::InvalidIdentifier {
            name: name.to_string(),
            target: "rust",
        })
    }
}

fn type_param(g: &GenericParam) -> Result<syn::TypeParam, EmissionError> {
    let src = match &g.kind {
        Some(kind) if !g.is_plain_type() => format!("{}: {}", g.name, kind),
        _ => g.name.clone(),
    };
    syn::parse_str::<syn::TypeParam>(&src).map_err(|e| EmissionError::Reparse {
        what: format!("generic parameter '{src}'"),
        reason: e.to_string(),
    })
}

// ── Emission ─────────────────────────────────────────────────────────────────

/// Everything the token builders need, resolved once.
struct Shim<'s> {
    spec: &'s InterfaceSpec,
    handle: Ident,
    data: Ident,
    imp: Ident,
    vtable: Ident,
    holder: Ident,
    factory: Ident,
    generics: Vec<Ident>,
    generic_decls: Vec<syn::TypeParam>,
    ops: Vec<Op<'s>>,
}

struct Op<'s> {
    spec: &'s OperationSpec,
    name: Ident,
    param_names: Vec<Ident>,
    param_types: Vec<syn::Type>,
    /// `None` for unit.
    ret: Option<syn::Type>,
    /// Return type with references bound to `'r` (table entries, thunks).
    ret_r: Option<syn::Type>,
    /// Return type with references bound to `'d` (unbound forwarders).
    ret_d: Option<syn::Type>,
}

impl<'s> Shim<'s> {
    fn new(spec: &'s InterfaceSpec) -> Result<Self, EmissionError> {
        let base = ident(&spec.name)?;
        let ops = spec
            .operations
            .iter()
            .map(Op::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            spec,
            data: format_ident!("{}Data", base),
            imp: format_ident!("{}Impl", base),
            vtable: format_ident!("{}VTable", base),
            holder: format_ident!("{}VTableFor", base),
            factory: ident(&format!("make_{}", super::to_snake_case(&spec.name)))?,
            handle: base,
            generics: spec
                .generic_params
                .iter()
                .map(|g| ident(&g.name))
                .collect::<Result<_, _>>()?,
            generic_decls: spec
                .generic_params
                .iter()
                .map(type_param)
                .collect::<Result<_, _>>()?,
            ops,
        })
    }

    fn fragments(&self, options: &GenerateOptions) -> Result<Vec<Fragment>, EmissionError> {
        let items = [
            (FragmentKind::DataReference, "data reference", self.data_reference()),
            (FragmentKind::ImplementerTrait, "implementer trait", self.implementer_trait()),
            (FragmentKind::DispatchTable, "dispatch table", self.dispatch_table()),
            (FragmentKind::Handle, "handle", self.handle()),
            (FragmentKind::Construction, "table construction", self.construction()),
            (FragmentKind::Factory, "factory", self.factory()),
        ];

        let mut out = vec![Fragment::new(FragmentKind::Envelope, self.envelope(options))];
        for (kind, what, tokens) in items {
            out.push(Fragment::new(kind, self.format(tokens, what)?));
        }
        out.push(Fragment::new(FragmentKind::EnvelopeClose, self.envelope_close()));
        out.push(Fragment::new(FragmentKind::Advisory, self.advisory()?));
        Ok(out)
    }

    /// Re-parse, pretty-print and indent to the namespace depth.
    fn format(&self, tokens: TokenStream, what: &str) -> Result<String, EmissionError> {
        let file: syn::File = syn::parse2(tokens).map_err(|e| EmissionError::Reparse {
            what: what.to_string(),
            reason: e.to_string(),
        })?;
        let text = prettyplease::unparse(&file);
        Ok(indent_lines(&text, self.spec.namespace.len()))
    }

    // ── Envelope ─────────────────────────────────────────────────────────────

    fn envelope(&self, options: &GenerateOptions) -> String {
        let mut lines: Vec<String> = Vec::new();
        if options.header {
            lines.push(format!(
                "// @generated by shimgen from interface `{}` ({}). Do not edit by hand.",
                self.spec.name, self.spec.binding_mode
            ));
            lines.push(String::new());
        }

        for (depth, seg) in self.spec.namespace.iter().enumerate() {
            lines.push(format!("{}pub mod {seg} {{", pad(depth)));
        }

        let depth = self.spec.namespace.len();
        let uses: Vec<String> = self
            .spec
            .imports
            .iter()
            .map(|i| i.trim())
            .filter(|i| syn::parse_str::<syn::UseTree>(i).is_ok())
            .map(|i| format!("{}use {i};", pad(depth)))
            .collect();
        lines.extend(uses);

        if lines.iter().all(|l| l.is_empty()) {
            return String::new();
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn envelope_close(&self) -> String {
        (0..self.spec.namespace.len())
            .rev()
            .map(|depth| format!("{}}}\n", pad(depth)))
            .collect()
    }

    // ── Data reference ───────────────────────────────────────────────────────

    fn data_reference(&self) -> TokenStream {
        let data = &self.data;
        let doc = format!(
            " Type-erased mutable reference to a value implementing [`{}`].",
            self.imp
        );
        quote! {
            #[doc = #doc]
            #[derive(Clone, Copy)]
            pub struct #data<'a> {
                ptr: ::core::ptr::NonNull<()>,
                _marker: ::core::marker::PhantomData<&'a mut ()>,
            }

            impl<'a> #data<'a> {
                /// Erase `value`.
                pub fn new<M>(value: &'a mut M) -> Self {
                    Self {
                        ptr: ::core::ptr::NonNull::from(value).cast(),
                        _marker: ::core::marker::PhantomData,
                    }
                }

                pub fn as_ptr(self) -> *mut () {
                    self.ptr.as_ptr()
                }
            }
        }
    }

    // ── Implementer trait ────────────────────────────────────────────────────

    fn implementer_trait(&self) -> TokenStream {
        let imp = &self.imp;
        let decl = self.decl_angle();
        let doc = format!(
            " Operations a concrete type provides to be used through [`{}`].",
            self.handle
        );

        let methods = self.ops.iter().map(|op| {
            let name = &op.name;
            let recv = op.receiver();
            let params = op.params_decl();
            let ret = arrow(&op.ret);
            if op.spec.is_optional() {
                let names = &op.param_names;
                let silence = if names.is_empty() {
                    quote!()
                } else {
                    quote!(let _ = (#(#names,)*);)
                };
                let default = op.default_value();
                quote! {
                    /// Optional. The default does nothing and returns an inert value.
                    fn #name(#recv #(, #params)*) #ret {
                        #silence
                        #default
                    }
                }
            } else {
                quote! {
                    fn #name(#recv #(, #params)*) #ret;
                }
            }
        });

        quote! {
            #[doc = #doc]
            pub trait #imp #decl {
                #(#methods)*
            }
        }
    }

    // ── Dispatch table ───────────────────────────────────────────────────────

    fn dispatch_table(&self) -> TokenStream {
        let Self {
            data,
            imp,
            vtable,
            ..
        } = self;
        let decl = self.decl_angle();
        let used = self.use_angle();
        let holder = self.holder_path();
        let name_str = vtable.to_string();
        let doc = format!(
            " Dispatch table for [`{}`]: one entry per operation, in declaration order.",
            self.handle
        );

        let fields = self.ops.iter().map(|op| {
            let name = &op.name;
            let tys = &op.param_types;
            let ret = arrow(&op.ret_r);
            quote! {
                pub #name: for<'r> unsafe fn(#data<'r> #(, #tys)*) #ret,
            }
        });
        let inits = self.ops.iter().map(|op| {
            let name = &op.name;
            quote!(#name: #holder::#name,)
        });
        let (marker_field, marker_init) = if self.generics.is_empty() {
            (quote!(), quote!())
        } else {
            let g = &self.generics;
            (
                quote!(_marker: ::core::marker::PhantomData<fn() -> (#(#g,)*)>,),
                quote!(_marker: ::core::marker::PhantomData,),
            )
        };
        let static_bounds = self.static_where();

        let eq_body = if self.ops.is_empty() {
            quote! {
                let _ = other;
                true
            }
        } else {
            let cmps = self.ops.iter().map(|op| {
                let name = &op.name;
                quote!(self.#name as usize == other.#name as usize)
            });
            quote!(#(#cmps)&&*)
        };
        let debug_fields = self.ops.iter().map(|op| {
            let name = &op.name;
            let label = name.to_string();
            quote!(.field(#label, &(self.#name as *const ())))
        });

        quote! {
            #[doc = #doc]
            pub struct #vtable #decl {
                #(#fields)*
                #marker_field
            }

            impl #decl #vtable #used {
                /// Build the table for concrete type `M`.
                pub const fn of<M: #imp #used + 'static>() -> Self {
                    Self {
                        #(#inits)*
                        #marker_init
                    }
                }

                /// The shared constant table for `M`.
                pub fn for_type<M: #imp #used + 'static>() -> &'static Self
                #static_bounds
                {
                    &#holder::TABLE
                }
            }

            impl #decl ::core::clone::Clone for #vtable #used {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl #decl ::core::marker::Copy for #vtable #used {}

            impl #decl ::core::cmp::PartialEq for #vtable #used {
                fn eq(&self, other: &Self) -> bool {
                    #eq_body
                }
            }

            impl #decl ::core::cmp::Eq for #vtable #used {}

            impl #decl ::core::fmt::Debug for #vtable #used {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.debug_struct(#name_str)
                        #(#debug_fields)*
                        .finish()
                }
            }
        }
    }

    // ── Handle ───────────────────────────────────────────────────────────────

    fn handle(&self) -> TokenStream {
        match self.spec.binding_mode {
            BindingMode::Bound => self.bound_handle(),
            BindingMode::Unbound => self.unbound_handle(),
        }
    }

    fn bound_handle(&self) -> TokenStream {
        let Self {
            handle,
            data,
            vtable,
            ..
        } = self;
        let decls = &self.generic_decls;
        let g = &self.generics;
        let used = self.use_angle();
        let doc = format!(
            " Handle pairing an erased value with its [`{vtable}`]. Build one with [`{}`].",
            self.factory
        );

        let forwarders = self.ops.iter().map(|op| {
            let name = &op.name;
            let recv = op.receiver();
            let params = op.params_decl();
            let args = &op.param_names;
            let ret = arrow(&op.ret);
            let doc = format!(" Forwards to [`{}::{}`].", self.imp, name);
            quote! {
                #[doc = #doc]
                pub fn #name(#recv #(, #params)*) #ret {
                    unsafe { (self.vtable.#name)(self.data #(, #args)*) }
                }
            }
        });

        // Without operations nothing reads `data`.
        let data_attr = if self.ops.is_empty() {
            quote!(#[allow(dead_code)])
        } else {
            quote!()
        };

        quote! {
            #[doc = #doc]
            pub struct #handle<'a #(, #decls)*> {
                #data_attr
                data: #data<'a>,
                vtable: &'a #vtable #used,
            }

            impl<'a #(, #decls)*> #handle<'a #(, #g)*> {
                /// Assemble a handle from an erased value and a table.
                ///
                /// # Safety
                ///
                /// `vtable` must have been built for the concrete type `data` was
                /// erased from.
                pub unsafe fn from_raw_parts(data: #data<'a>, vtable: &'a #vtable #used) -> Self {
                    Self { data, vtable }
                }

                pub fn vtable(&self) -> &'a #vtable #used {
                    self.vtable
                }

                /// `true` when both handles dispatch through the same table.
                pub fn same_type(&self, other: &#handle<'_ #(, #g)*>) -> bool {
                    ::core::ptr::eq(self.vtable, other.vtable)
                }

                #(#forwarders)*
            }
        }
    }

    fn unbound_handle(&self) -> TokenStream {
        let Self {
            handle,
            data,
            vtable,
            ..
        } = self;
        let decls = &self.generic_decls;
        let g = &self.generics;
        let used = self.use_angle();
        let doc = format!(
            " Table-only handle over [`{vtable}`]. Every operation takes the erased value \
             as its first argument."
        );

        let forwarders = self.ops.iter().map(|op| {
            let name = &op.name;
            let params = op.params_decl();
            let args = &op.param_names;
            let ret = arrow(&op.ret_d);
            let doc = format!(" Forwards to [`{}::{}`].", self.imp, name);
            let access = if op.spec.is_read_only() {
                " `data` must not be mutably aliased for the duration of the call."
            } else {
                " No other reference to the value may be in use for the duration of the call."
            };
            quote! {
                #[doc = #doc]
                ///
                /// # Safety
                ///
                /// `data` must have been erased from a live value of the concrete type
                /// this handle's table was built for.
                #[doc = #access]
                pub unsafe fn #name<'d>(&self, data: #data<'d> #(, #params)*) #ret {
                    unsafe { (self.vtable.#name)(data #(, #args)*) }
                }
            }
        });

        quote! {
            #[doc = #doc]
            pub struct #handle<'a #(, #decls)*> {
                vtable: &'a #vtable #used,
            }

            impl<'a #(, #decls)*> ::core::clone::Clone for #handle<'a #(, #g)*> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<'a #(, #decls)*> ::core::marker::Copy for #handle<'a #(, #g)*> {}

            impl<'a #(, #decls)*> #handle<'a #(, #g)*> {
                pub fn from_vtable(vtable: &'a #vtable #used) -> Self {
                    Self { vtable }
                }

                pub fn vtable(&self) -> &'a #vtable #used {
                    self.vtable
                }

                /// `true` when both handles dispatch through the same table.
                pub fn same_type(&self, other: &#handle<'_ #(, #g)*>) -> bool {
                    ::core::ptr::eq(self.vtable, other.vtable)
                }

                #(#forwarders)*
            }
        }
    }

    // ── Construction ─────────────────────────────────────────────────────────

    fn construction(&self) -> TokenStream {
        let Self {
            data,
            imp,
            vtable,
            holder,
            ..
        } = self;
        let decls = &self.generic_decls;
        let g = &self.generics;
        let used = self.use_angle();
        let doc = format!(
            " Per-type holder of the [`{vtable}`] for concrete type `M`. \
             `&{holder}::<..>::TABLE` is a `'static` reference."
        );

        let thunks = self.ops.iter().map(|op| {
            let name = &op.name;
            let params = op.params_decl();
            let args = &op.param_names;
            let ret = arrow(&op.ret_r);
            let recv = if op.spec.is_read_only() {
                quote!(&*data.as_ptr().cast::<M>())
            } else {
                quote!(&mut *data.as_ptr().cast::<M>())
            };
            quote! {
                unsafe fn #name<'r>(data: #data<'r> #(, #params)*) #ret {
                    unsafe { <M as #imp #used>::#name(#recv #(, #args)*) }
                }
            }
        });

        quote! {
            #[doc = #doc]
            pub struct #holder<#(#decls,)* M>(::core::marker::PhantomData<fn() -> (#(#g,)* M,)>);

            impl<#(#decls,)* M> #holder<#(#g,)* M>
            where
                M: #imp #used + 'static,
            {
                pub const TABLE: #vtable #used = <#vtable #used>::of::<M>();

                #(#thunks)*
            }
        }
    }

    // ── Factory ──────────────────────────────────────────────────────────────

    fn factory(&self) -> TokenStream {
        let Self {
            handle,
            data,
            imp,
            vtable,
            factory,
            ..
        } = self;
        let decls = &self.generic_decls;
        let g = &self.generics;
        let used = self.use_angle();

        match self.spec.binding_mode {
            BindingMode::Bound => {
                let doc = format!(
                    " Erase `data` behind a [`{handle}`] using the shared table for `M`."
                );
                quote! {
                    #[doc = #doc]
                    pub fn #factory<'a, #(#decls,)* M>(data: &'a mut M) -> #handle<'a #(, #g)*>
                    where
                        #(#g: 'static,)*
                        M: #imp #used + 'static,
                    {
                        #handle {
                            data: #data::new(data),
                            vtable: <#vtable #used>::for_type::<M>(),
                        }
                    }
                }
            }
            BindingMode::Unbound => {
                let doc = format!(" A [`{handle}`] over the shared table for `M`.");
                quote! {
                    #[doc = #doc]
                    pub fn #factory<#(#decls,)* M>() -> #handle<'static #(, #g)*>
                    where
                        #(#g: 'static,)*
                        M: #imp #used + 'static,
                    {
                        #handle::from_vtable(<#vtable #used>::for_type::<M>())
                    }
                }
            }
        }
    }

    // ── Advisory ─────────────────────────────────────────────────────────────

    fn advisory(&self) -> Result<String, EmissionError> {
        let generics = if self.generics.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = self.generics.iter().map(Ident::to_string).collect();
            format!("<{}>", names.join(", "))
        };

        let mut text = format!("// IMPLEMENTATION ({}{generics})\n", self.imp);
        for op in &self.spec.operations {
            let recv = if op.is_read_only() { "&self" } else { "&mut self" };
            let mut params = vec![recv.to_string()];
            for p in &op.params {
                params.push(format!("{}: {}", p.name, rust_type_str(&p.ty, None)?));
            }
            let ret = if op.return_type.is_unit() {
                String::new()
            } else {
                format!(" -> {}", rust_type_str(&op.return_type, None)?)
            };
            let marker = if op.is_optional() { " [optional]" } else { "" };
            text.push_str(&format!(
                "// fn {}({}){ret};{marker}\n",
                op.name,
                params.join(", ")
            ));
        }
        Ok(text)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    /// `<T: Bound, U>` or nothing.
    fn decl_angle(&self) -> TokenStream {
        let decls = &self.generic_decls;
        if decls.is_empty() {
            quote!()
        } else {
            quote!(<#(#decls),*>)
        }
    }

    /// `<T, U>` or nothing.
    fn use_angle(&self) -> TokenStream {
        let g = &self.generics;
        if g.is_empty() {
            quote!()
        } else {
            quote!(<#(#g),*>)
        }
    }

    /// `ListVTableFor::<T, M>`
    fn holder_path(&self) -> TokenStream {
        let holder = &self.holder;
        let g = &self.generics;
        quote!(#holder::<#(#g,)* M>)
    }

    fn static_where(&self) -> TokenStream {
        let g = &self.generics;
        if g.is_empty() {
            quote!()
        } else {
            quote!(where #(#g: 'static),*)
        }
    }
}

impl<'s> Op<'s> {
    fn new(spec: &'s OperationSpec) -> Result<Self, EmissionError> {
        let ret_of = |lifetime: Option<&str>| -> Result<Option<syn::Type>, EmissionError> {
            if spec.return_type.is_unit() {
                Ok(None)
            } else {
                rust_type(&spec.return_type, lifetime).map(Some)
            }
        };

        Ok(Self {
            spec,
            name: ident(&spec.name)?,
            param_names: spec
                .params
                .iter()
                .map(|p| ident(&p.name))
                .collect::<Result<_, _>>()?,
            param_types: spec
                .params
                .iter()
                .map(|p| rust_type(&p.ty, None))
                .collect::<Result<_, _>>()?,
            ret: ret_of(None)?,
            ret_r: ret_of(Some("'r"))?,
            ret_d: ret_of(Some("'d"))?,
        })
    }

    fn receiver(&self) -> TokenStream {
        if self.spec.is_read_only() {
            quote!(&self)
        } else {
            quote!(&mut self)
        }
    }

    fn params_decl(&self) -> Vec<TokenStream> {
        self.param_names
            .iter()
            .zip(&self.param_types)
            .map(|(n, t)| quote!(#n: #t))
            .collect()
    }

    /// Inert value returned by an optional operation's default body.
    fn default_value(&self) -> TokenStream {
        match &self.spec.return_type {
            TypeExpr::Unit => quote!(),
            TypeExpr::Ptr { mutable: true, .. } => quote!(::core::ptr::null_mut()),
            TypeExpr::Ptr { mutable: false, .. } => quote!(::core::ptr::null()),
            _ => quote!(::core::default::Default::default()),
        }
    }
}

fn arrow(ty: &Option<syn::Type>) -> TokenStream {
    match ty {
        Some(t) => quote!(-> #t),
        None => quote!(),
    }
}

fn pad(depth: usize) -> String {
    "    ".repeat(depth)
}

fn indent_lines(text: &str, depth: usize) -> String {
    if depth == 0 {
        return text.to_string();
    }
    let prefix = pad(depth);
    let mut out = String::with_capacity(text.len() + text.lines().count() * prefix.len());
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str(&prefix);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

// ── Target checks ────────────────────────────────────────────────────────────

fn check_rust(spec: &InterfaceSpec) -> Vec<CheckDiagnostic> {
    let mut diags = Vec::new();
    let keyword = |name: &str| RUST_KEYWORDS.contains(&name);

    if keyword(&spec.name) {
        diags.push(CheckDiagnostic::error(
            "name",
            format!("'{}' is a Rust keyword", spec.name),
        ));
    }

    for (idx, seg) in spec.namespace.iter().enumerate() {
        if !is_identifier(seg) || keyword(seg) {
            diags.push(
                CheckDiagnostic::error(
                    format!("namespace[{idx}]"),
                    "namespace segment is not a valid Rust module name",
                )
                .found(format!("'{seg}'")),
            );
        }
    }

    for (idx, import) in spec.imports.iter().enumerate() {
        if syn::parse_str::<syn::UseTree>(import.trim()).is_err() {
            diags.push(CheckDiagnostic::warning(
                format!("imports[{idx}]"),
                format!("import '{import}' is not a Rust path and is ignored by the Rust target"),
            ));
        }
    }

    for (idx, g) in spec.generic_params.iter().enumerate() {
        let loc = format!("generic_params[{idx}]");
        if g.name == "M" {
            diags.push(CheckDiagnostic::error(
                &loc,
                "generic parameter 'M' collides with the concrete-type parameter of the generated code",
            ));
        }
        if keyword(&g.name) {
            diags.push(CheckDiagnostic::error(
                &loc,
                format!("'{}' is a Rust keyword", g.name),
            ));
        }
        if let Some(kind) = g.kind.as_deref().filter(|_| !g.is_plain_type()) {
            if CONST_KINDS.contains(&kind.trim()) || c_primitive(kind).is_some() {
                diags.push(
                    CheckDiagnostic::error(
                        format!("{loc}.kind"),
                        format!(
                            "value generic '{}: {kind}' is not supported by the Rust target",
                            g.name
                        ),
                    )
                    .expected("typename or a trait bound"),
                );
            } else if type_param(g).is_err() {
                diags.push(
                    CheckDiagnostic::error(
                        format!("{loc}.kind"),
                        format!("kind '{kind}' is not a valid Rust trait bound"),
                    )
                    .found(kind),
                );
            }
        }
    }

    for (idx, op) in spec.operations.iter().enumerate() {
        let loc = format!("operations[{idx}]");

        if keyword(&op.name) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!("operation name '{}' is a Rust keyword", op.name),
            ));
        } else if RESERVED_HANDLE_METHODS.contains(&op.name.as_str()) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!(
                    "operation name '{}' collides with a generated handle method",
                    op.name
                ),
            ));
        } else if RESERVED_HOLDER_ITEMS.contains(&op.name.as_str()) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!(
                    "operation name '{}' collides with the generated table constant",
                    op.name
                ),
            ));
        }

        for (pidx, p) in op.params.iter().enumerate() {
            let ploc = format!("{loc}.params[{pidx}]");
            if keyword(&p.name) && p.name != "self" {
                diags.push(CheckDiagnostic::error(
                    &ploc,
                    format!("parameter name '{}' is a Rust keyword", p.name),
                ));
            }
            if let Err(e) = rust_type(&p.ty, None) {
                diags.push(
                    CheckDiagnostic::error(format!("{ploc}.type"), e.to_string())
                        .found(p.ty.to_string()),
                );
            }
        }

        if let Err(e) = rust_type(&op.return_type, Some("'r")) {
            diags.push(
                CheckDiagnostic::error(format!("{loc}.return_type"), e.to_string())
                    .found(op.return_type.to_string()),
            );
        }

        if op.is_read_only() && has_mut_ref(&op.return_type) {
            diags.push(CheckDiagnostic::warning(
                format!("{loc}.return_type"),
                format!(
                    "read-only operation '{}' returns a mutable reference",
                    op.name
                ),
            ));
        }

        if op.is_optional() {
            if let TypeExpr::Named { path, args } = &op.return_type {
                let bare = path.len() == 1 && args.is_empty();
                let param = spec.generic_params.iter().find(|g| bare && g.name == path[0]);
                if let Some(g) = param {
                    let has_default = g
                        .kind
                        .as_deref()
                        .is_some_and(|k| k.split('+').any(|b| b.trim().ends_with("Default")));
                    if !has_default {
                        diags.push(
                            CheckDiagnostic::error(
                                format!("{loc}.return_type"),
                                format!(
                                    "optional operation '{}' returns '{}', which has no Default bound",
                                    op.name, g.name
                                ),
                            )
                            .expected(format!("{}: Default", g.name)),
                        );
                    }
                }
            }
        }
    }

    diags
}

fn has_mut_ref(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Unit => false,
        TypeExpr::Ref { mutable, inner } => *mutable || has_mut_ref(inner),
        TypeExpr::Ptr { inner, .. } => has_mut_ref(inner),
        TypeExpr::Named { args, .. } => args.iter().any(|a| match a {
            TypeArg::Type(t) => has_mut_ref(t),
            TypeArg::Const(_) => false,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
