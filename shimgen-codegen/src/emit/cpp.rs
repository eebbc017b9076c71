//! C++ backend
//!
//! Emits a single header: a `struct` holding the erased `impl` pointer and a
//! `const VTable*`, forwarding member functions, a `vtable_helper<Impl>`
//! variable template whose lambdas cast back to the concrete type, and a
//! `make_<name>` factory. Requires C++20 (designated initializers and, for
//! optional operations, `requires` expressions).

use super::writer::CodeWriter;
use super::{Backend, Fragment, FragmentKind, GenerateOptions, Target};
use crate::check::CheckDiagnostic;
use crate::error::EmissionError;
use crate::model::{BindingMode, GenericParam, GuardStyle, InterfaceSpec, OperationSpec};
use crate::types::{is_identifier, TypeArg, TypeExpr};

/// Member names the generated struct defines itself.
pub const RESERVED_MEMBERS: &[&str] = &["impl", "vtbl", "VTable", "vtable_helper", "same_type"];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
];

pub struct CppBackend;

impl Backend for CppBackend {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn check(&self, spec: &InterfaceSpec) -> Vec<CheckDiagnostic> {
        check_cpp(spec)
    }

    fn emit(
        &self,
        spec: &InterfaceSpec,
        options: &GenerateOptions,
    ) -> Result<Vec<Fragment>, EmissionError> {
        Header::new(spec, options)?.fragments()
    }
}

// ── Type rendering ───────────────────────────────────────────────────────────

/// Render a type token in C++ syntax.
pub fn cpp_type_str(ty: &TypeExpr) -> Result<String, EmissionError> {
    match ty {
        TypeExpr::Unit => Ok("void".to_string()),
        TypeExpr::Ref { mutable, inner } => qualified(inner, *mutable, "&"),
        TypeExpr::Ptr { mutable, inner } => qualified(inner, *mutable, "*"),
        TypeExpr::Named { path, args } => {
            if path.len() == 1 && args.is_empty() {
                if let Some(mapped) = rust_primitive(&path[0]) {
                    return mapped.map(str::to_string).map_err(|reason| unrenderable(ty, reason));
                }
            }
            let mut out = path.join("::");
            if !args.is_empty() {
                let rendered = args
                    .iter()
                    .map(|a| match a {
                        TypeArg::Type(t) => cpp_type_str(t),
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

/// `const T&` for named pointees, `T* const*` when the pointee is itself
/// a pointer or reference.
fn qualified(inner: &TypeExpr, mutable: bool, sigil: &str) -> Result<String, EmissionError> {
    let inner_str = cpp_type_str(inner)?;
    Ok(match (mutable, inner) {
        (true, _) => format!("{inner_str}{sigil}"),
        (false, TypeExpr::Ptr { .. } | TypeExpr::Ref { .. }) => format!("{inner_str} const{sigil}"),
        (false, _) => format!("const {inner_str}{sigil}"),
    })
}

fn unrenderable(ty: &TypeExpr, reason: impl Into<String>) -> EmissionError {
    EmissionError::UnrenderableType {
        token: ty.to_string(),
        target: "cpp",
        reason: reason.into(),
    }
}

/// Rust primitive spellings with a fixed C++ equivalent.
fn rust_primitive(name: &str) -> Option<Result<&'static str, String>> {
    Some(Ok(match name {
        "i8" => "std::int8_t",
        "i16" => "std::int16_t",
        "i32" => "std::int32_t",
        "i64" => "std::int64_t",
        "u8" => "std::uint8_t",
        "u16" => "std::uint16_t",
        "u32" => "std::uint32_t",
        "u64" => "std::uint64_t",
        "usize" => "std::size_t",
        "isize" => "std::ptrdiff_t",
        "f32" => "float",
        "f64" => "double",
        "i128" | "u128" | "str" => {
            return Some(Err(format!("no portable C++ equivalent for '{name}'")))
        }
        _ => return None,
    }))
}

/// Standard headers the rendered type needs.
fn required_headers(ty: &TypeExpr, out: &mut Vec<&'static str>) {
    match ty {
        TypeExpr::Unit => {}
        TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } => required_headers(inner, out),
        TypeExpr::Named { path, args } => {
            if path.len() == 1 && args.is_empty() {
                let header = match path[0].as_str() {
                    "usize" | "isize" => Some("<cstddef>"),
                    "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" => {
                        Some("<cstdint>")
                    }
                    _ => None,
                };
                if let Some(h) = header {
                    if !out.contains(&h) {
                        out.push(h);
                    }
                }
            }
            for arg in args {
                if let TypeArg::Type(t) = arg {
                    required_headers(t, out);
                }
            }
        }
    }
}

/// `<x>` and `"x"` are kept as written, bare names are quoted.
fn include_line(import: &str) -> String {
    let import = import.trim();
    let quoted = (import.starts_with('<') && import.ends_with('>'))
        || (import.starts_with('"') && import.ends_with('"'));
    if quoted {
        format!("#include {import}")
    } else {
        format!("#include \"{import}\"")
    }
}

fn is_rust_path(import: &str) -> bool {
    import.contains("::")
}

fn template_decl(g: &GenericParam) -> String {
    match &g.kind {
        Some(kind) if !g.is_plain_type() => format!("{} {}", kind.trim(), g.name),
        _ => format!("typename {}", g.name),
    }
}

fn checked_name(name: &str) -> Result<&str, EmissionError> {
    if is_identifier(name) && !CPP_KEYWORDS.contains(&name) {
        Ok(name)
    } else {
        Err(EmissionError::InvalidIdentifier {
            name: name.to_string(),
            target: "cpp",
        })
    }
}

// ── Emission ─────────────────────────────────────────────────────────────────

struct Header<'s> {
    spec: &'s InterfaceSpec,
    options: &'s GenerateOptions,
    /// `List<T>` or `Allocator`.
    self_ty: String,
    /// `template<typename T>` or empty.
    template_line: Option<String>,
    factory: String,
    ops: Vec<CppOp<'s>>,
}

struct CppOp<'s> {
    spec: &'s OperationSpec,
    ret: String,
    /// `int idx`, one per parameter.
    params: Vec<String>,
    args: Vec<&'s str>,
}

impl<'s> CppOp<'s> {
    fn new(spec: &'s OperationSpec) -> Result<Self, EmissionError> {
        checked_name(&spec.name)?;
        let params = spec
            .params
            .iter()
            .map(|p| Ok(format!("{} {}", cpp_type_str(&p.ty)?, checked_name(&p.name)?)))
            .collect::<Result<Vec<_>, EmissionError>>()?;
        Ok(Self {
            spec,
            ret: cpp_type_str(&spec.return_type)?,
            params,
            args: spec.params.iter().map(|p| p.name.as_str()).collect(),
        })
    }

    fn impl_param(&self) -> &'static str {
        if self.spec.is_read_only() {
            "const void* impl"
        } else {
            "void* impl"
        }
    }

    /// Table-entry / lambda parameter list: the erased pointer first.
    fn erased_params(&self) -> String {
        std::iter::once(self.impl_param().to_string())
            .chain(self.params.iter().cloned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn call_args(&self) -> String {
        self.args.join(", ")
    }

    fn inert_return(&self) -> String {
        match &self.spec.return_type {
            TypeExpr::Unit => "return;".to_string(),
            TypeExpr::Ptr { .. } => "return nullptr;".to_string(),
            _ => format!("return {}{{}};", self.ret),
        }
    }
}

impl<'s> Header<'s> {
    fn new(spec: &'s InterfaceSpec, options: &'s GenerateOptions) -> Result<Self, EmissionError> {
        checked_name(&spec.name)?;
        for g in &spec.generic_params {
            checked_name(&g.name)?;
        }
        let self_ty = if spec.is_generic() {
            let names: Vec<&str> = spec.generic_params.iter().map(|g| g.name.as_str()).collect();
            format!("{}<{}>", spec.name, names.join(", "))
        } else {
            spec.name.clone()
        };
        let template_line = spec.is_generic().then(|| {
            let decls: Vec<String> = spec.generic_params.iter().map(template_decl).collect();
            format!("template<{}>", decls.join(", "))
        });

        Ok(Self {
            spec,
            options,
            self_ty,
            template_line,
            factory: format!("make_{}", super::to_snake_case(&spec.name)),
            ops: spec
                .operations
                .iter()
                .map(CppOp::new)
                .collect::<Result<_, _>>()?,
        })
    }

    fn fragments(&self) -> Result<Vec<Fragment>, EmissionError> {
        Ok(vec![
            Fragment::new(FragmentKind::Envelope, self.envelope()?),
            Fragment::new(FragmentKind::DispatchTable, self.dispatch_table()),
            Fragment::new(FragmentKind::Handle, self.handle()),
            Fragment::new(FragmentKind::Construction, self.construction()),
            Fragment::new(FragmentKind::Factory, self.factory()),
            Fragment::new(FragmentKind::EnvelopeClose, self.envelope_close()),
            Fragment::new(FragmentKind::Advisory, self.advisory()),
        ])
    }

    fn writer(&self, level: usize) -> CodeWriter {
        CodeWriter::at_level(self.options.indent, level)
    }

    fn guard(&self) -> &GuardStyle {
        self.options.guard_for(self.spec)
    }

    // ── Envelope ─────────────────────────────────────────────────────────────

    fn envelope(&self) -> Result<String, EmissionError> {
        let mut w = self.writer(0);
        if self.options.header {
            w.line(format!(
                "// @generated by shimgen from interface `{}` ({}). Do not edit by hand.",
                self.spec.name, self.spec.binding_mode
            ));
            w.blank();
        }

        match self.guard() {
            GuardStyle::PragmaOnce => {
                w.line("#pragma once").blank();
            }
            guard @ GuardStyle::MacroGuard(_) => {
                if let Some(name) = guard.macro_name(&self.spec.name) {
                    w.line(format!("#ifndef {name}"));
                    w.line(format!("#define {name}")).blank();
                }
            }
            GuardStyle::None => {}
        }

        let mut headers: Vec<&'static str> = Vec::new();
        for op in &self.spec.operations {
            required_headers(&op.return_type, &mut headers);
            for p in &op.params {
                required_headers(&p.ty, &mut headers);
            }
        }
        headers.sort_unstable();
        let mut includes: Vec<String> = headers
            .iter()
            .filter(|h| !self.spec.imports.iter().any(|i| i.trim() == **h))
            .map(|h| format!("#include {h}"))
            .collect();
        includes.extend(
            self.spec
                .imports
                .iter()
                .filter(|i| !is_rust_path(i))
                .map(|i| include_line(i.as_str())),
        );
        if !includes.is_empty() {
            for line in includes {
                w.line(line);
            }
            w.blank();
        }

        for seg in &self.spec.namespace {
            w.line(format!("namespace {} {{", checked_name(seg)?));
        }

        let mut text = w.finish();
        while text.ends_with("\n\n") {
            text.pop();
        }
        Ok(text)
    }

    fn envelope_close(&self) -> String {
        let mut w = self.writer(0);
        for seg in self.spec.namespace.iter().rev() {
            w.line(format!("}} // namespace {seg}"));
        }
        if let guard @ GuardStyle::MacroGuard(_) = self.guard() {
            if let Some(name) = guard.macro_name(&self.spec.name) {
                if !self.spec.namespace.is_empty() {
                    w.blank();
                }
                w.line(format!("#endif /* {name} */"));
            }
        }
        w.finish()
    }

    // ── Struct ───────────────────────────────────────────────────────────────

    /// Opens the struct and declares its `VTable`.
    fn dispatch_table(&self) -> String {
        let mut w = self.writer(0);
        if let Some(t) = &self.template_line {
            w.line(t);
        }
        w.open(format!("struct {} {{", self.spec.name));
        w.open("struct VTable {");
        for op in &self.ops {
            w.line(format!(
                "{} (*{})({});",
                op.ret,
                op.spec.name,
                op.erased_params()
            ));
        }
        w.close("};");
        w.finish()
    }

    fn handle(&self) -> String {
        let mut w = self.writer(1);
        let bound = self.spec.binding_mode == BindingMode::Bound;

        if bound {
            w.line("void* impl = nullptr;");
        }
        w.line("const VTable* vtbl = nullptr;");

        for op in &self.ops {
            w.blank();
            // Unbound handles take the erased pointer as their first argument.
            let params = if bound {
                op.params.join(", ")
            } else {
                op.erased_params()
            };
            let args = std::iter::once("impl")
                .chain(op.args.iter().copied())
                .collect::<Vec<_>>()
                .join(", ");
            let constness = if !bound || op.spec.is_read_only() {
                " const"
            } else {
                ""
            };
            w.open(format!("{} {}({params}){constness} {{", op.ret, op.spec.name));
            w.line(format!("return vtbl->{}({args});", op.spec.name));
            w.close("}");
        }

        w.blank();
        w.open(format!("bool same_type(const {}& other) const {{", self.self_ty));
        w.line("return vtbl == other.vtbl;");
        w.close("}");

        w.blank();
        w.open("explicit constexpr operator bool() const {");
        if bound {
            w.line("return impl != nullptr && vtbl != nullptr;");
        } else {
            w.line("return vtbl != nullptr;");
        }
        w.close("}");
        w.finish()
    }

    /// `vtable_helper<Impl>` and the closing of the struct.
    fn construction(&self) -> String {
        let mut w = self.writer(1);
        w.line("template<typename Impl>");
        w.open("static constexpr VTable vtable_helper = {");
        for op in &self.ops {
            let name = &op.spec.name;
            let cast = if op.spec.is_read_only() {
                "const Impl*"
            } else {
                "Impl*"
            };
            let call = format!("obj->{name}({})", op.call_args());

            w.open(format!(
                ".{name} = []({}) -> {} {{",
                op.erased_params(),
                op.ret
            ));
            w.line(format!("auto obj = reinterpret_cast<{cast}>(impl);"));
            if op.spec.is_optional() {
                w.open(format!("if constexpr (requires {{ {call}; }}) {{"));
                w.line(format!("return {call};"));
                w.reopen("} else {");
                w.line("(void)obj;");
                for arg in &op.args {
                    w.line(format!("(void){arg};"));
                }
                w.line(op.inert_return());
                w.close("}");
            } else {
                w.line(format!("return {call};"));
            }
            w.close("},");
        }
        w.close("};");
        w.close("};");
        w.finish()
    }

    fn factory(&self) -> String {
        let mut w = self.writer(0);
        let mut decls: Vec<String> = self.spec.generic_params.iter().map(template_decl).collect();
        decls.push("typename Impl".to_string());
        let helper = if self.spec.is_generic() {
            format!("&{}::template vtable_helper<Impl>", self.self_ty)
        } else {
            format!("&{}::vtable_helper<Impl>", self.self_ty)
        };

        w.line(format!("template<{}>", decls.join(", ")));
        match self.spec.binding_mode {
            BindingMode::Bound => {
                w.open(format!("{} {}(Impl* impl) {{", self.self_ty, self.factory));
                w.open(format!("return {}{{", self.self_ty));
                w.line(".impl = impl,");
            }
            BindingMode::Unbound => {
                w.open(format!("{} {}() {{", self.self_ty, self.factory));
                w.open(format!("return {}{{", self.self_ty));
            }
        }
        w.line(format!(".vtbl = {helper},"));
        w.close("};");
        w.close("}");
        w.finish()
    }

    // ── Advisory ─────────────────────────────────────────────────────────────

    fn advisory(&self) -> String {
        let mut text = String::from("/* IMPLEMENTATION\n");
        for op in &self.ops {
            let constness = if op.spec.is_read_only() { " const" } else { "" };
            let marker = if op.spec.is_optional() {
                " // [optional]"
            } else {
                ""
            };
            text.push_str(&format!(
                "{} {}({}){constness};{marker}\n",
                op.ret,
                op.spec.name,
                op.params.join(", ")
            ));
        }
        text.push_str("*/\n");
        text
    }
}

// ── Target checks ────────────────────────────────────────────────────────────

fn check_cpp(spec: &InterfaceSpec) -> Vec<CheckDiagnostic> {
    let mut diags = Vec::new();
    let keyword = |name: &str| CPP_KEYWORDS.contains(&name);

    if keyword(&spec.name) {
        diags.push(CheckDiagnostic::error(
            "name",
            format!("'{}' is a C++ keyword", spec.name),
        ));
    }

    for (idx, seg) in spec.namespace.iter().enumerate() {
        if !is_identifier(seg) || keyword(seg) {
            diags.push(
                CheckDiagnostic::error(
                    format!("namespace[{idx}]"),
                    "namespace segment is not a valid C++ identifier",
                )
                .found(format!("'{seg}'")),
            );
        }
    }

    for (idx, import) in spec.imports.iter().enumerate() {
        if is_rust_path(import) {
            diags.push(CheckDiagnostic::warning(
                format!("imports[{idx}]"),
                format!("import '{import}' looks like a Rust path and is ignored by the C++ target"),
            ));
        }
    }

    for (idx, g) in spec.generic_params.iter().enumerate() {
        let loc = format!("generic_params[{idx}]");
        if g.name == "Impl" {
            diags.push(CheckDiagnostic::error(
                &loc,
                "generic parameter 'Impl' collides with the concrete-type parameter of the generated code",
            ));
        }
        if keyword(&g.name) {
            diags.push(CheckDiagnostic::error(
                &loc,
                format!("'{}' is a C++ keyword", g.name),
            ));
        }
        if let Some(kind) = g.kind.as_deref() {
            let plain = kind
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == ' ');
            if !plain {
                diags.push(
                    CheckDiagnostic::error(
                        format!("{loc}.kind"),
                        format!("kind '{kind}' is not a C++ template parameter kind"),
                    )
                    .expected("typename, a concept name or a value type"),
                );
            }
        }
    }

    for (idx, op) in spec.operations.iter().enumerate() {
        let loc = format!("operations[{idx}]");

        if keyword(&op.name) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!("operation name '{}' is a C++ keyword", op.name),
            ));
        } else if RESERVED_MEMBERS.contains(&op.name.as_str()) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!("operation name '{}' collides with a generated member", op.name),
            ));
        } else if op.name == spec.name {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!(
                    "operation '{}' has the interface's name and would declare a constructor",
                    op.name
                ),
            ));
        }

        for (pidx, p) in op.params.iter().enumerate() {
            let ploc = format!("{loc}.params[{pidx}]");
            if keyword(&p.name) {
                diags.push(CheckDiagnostic::error(
                    &ploc,
                    format!("parameter name '{}' is a C++ keyword", p.name),
                ));
            } else if p.name == "obj" {
                diags.push(CheckDiagnostic::error(
                    &ploc,
                    "parameter name 'obj' collides with the generated forwarding lambda's local",
                ));
            }
            if let Err(e) = cpp_type_str(&p.ty) {
                diags.push(
                    CheckDiagnostic::error(format!("{ploc}.type"), e.to_string())
                        .found(p.ty.to_string()),
                );
            }
        }

        if let Err(e) = cpp_type_str(&op.return_type) {
            diags.push(
                CheckDiagnostic::error(format!("{loc}.return_type"), e.to_string())
                    .found(op.return_type.to_string()),
            );
        }
    }

    diags
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{emit, Indent};

    fn ty(s: &str) -> TypeExpr {
        TypeExpr::parse(s).unwrap()
    }

    fn opts() -> GenerateOptions {
        GenerateOptions::for_target(Target::Cpp)
    }

    fn list() -> InterfaceSpec {
        InterfaceSpec::new("List")
            .with_generic(GenericParam::new("T").with_kind("typename"))
            .with_operation(
                OperationSpec::new("at")
                    .with_param("idx", ty("int"))
                    .returning(ty("T&")),
            )
            .with_operation(OperationSpec::new("len").returning(ty("int")).read_only())
    }

    fn allocator() -> InterfaceSpec {
        let mut spec = InterfaceSpec::new("Allocator")
            .with_binding(BindingMode::Unbound)
            .with_guard(GuardStyle::MacroGuard("_ALLOCATOR_HPP_".into()))
            .with_operation(
                OperationSpec::new("alloc")
                    .with_param("nbytes", ty("size_t"))
                    .returning(ty("void*")),
            )
            .with_operation(
                OperationSpec::new("realloc")
                    .with_param("p", ty("void*"))
                    .with_param("nbytes", ty("size_t"))
                    .returning(ty("void*"))
                    .optional(),
            )
            .with_operation(OperationSpec::new("free_all"));
        spec.imports = vec!["<cstddef>".into(), "types.hpp".into()];
        spec.namespace = vec!["mem".into()];
        spec
    }

    #[test]
    fn generic_list_header() {
        let out = emit(&list(), &opts()).unwrap().render();

        assert!(out.contains("template<typename T>\nstruct List {"), "Missing struct:\n{out}");
        assert!(
            out.contains("\t\tT& (*at)(void* impl, int idx);"),
            "Missing at entry:\n{out}"
        );
        assert!(
            out.contains("\t\tint (*len)(const void* impl);"),
            "Missing len entry:\n{out}"
        );
        assert!(out.contains("\tvoid* impl = nullptr;"), "Missing impl:\n{out}");
        assert!(out.contains("\tint len() const {"), "Missing const forwarder:\n{out}");
        assert!(out.contains("\t\treturn vtbl->at(impl, idx);"), "Missing call:\n{out}");
        assert!(
            out.contains("auto obj = reinterpret_cast<const Impl*>(impl);"),
            "Missing const cast:\n{out}"
        );
        assert!(
            out.contains("template<typename T, typename Impl>\nList<T> make_list(Impl* impl) {"),
            "Missing factory:\n{out}"
        );
        assert!(
            out.contains(".vtbl = &List<T>::template vtable_helper<Impl>,"),
            "Missing helper ref:\n{out}"
        );
        assert!(out.contains("/* IMPLEMENTATION\nT& at(int idx);\nint len() const;\n*/"), "{out}");
    }

    #[test]
    fn unbound_allocator_with_guard_and_namespace() {
        let out = emit(&allocator(), &opts()).unwrap().render();

        assert!(out.starts_with("// @generated"), "{out}");
        assert!(
            out.contains("#ifndef _ALLOCATOR_HPP_\n#define _ALLOCATOR_HPP_\n"),
            "Missing guard:\n{out}"
        );
        assert!(out.contains("#include <cstddef>\n#include \"types.hpp\""), "{out}");
        assert_eq!(out.matches("#include <cstddef>").count(), 1, "{out}");
        assert!(out.contains("namespace mem {"), "{out}");
        assert!(out.contains("} // namespace mem"), "{out}");
        assert!(out.trim_end().ends_with("*/"), "{out}");
        assert!(out.contains("#endif /* _ALLOCATOR_HPP_ */"), "{out}");

        assert!(!out.contains("void* impl = nullptr;"), "unbound stores no impl:\n{out}");
        assert!(
            out.contains("\tvoid* alloc(void* impl, size_t nbytes) const {"),
            "Missing unbound forwarder:\n{out}"
        );
        assert!(out.contains("Allocator make_allocator() {"), "{out}");
        assert!(out.contains(".vtbl = &Allocator::vtable_helper<Impl>,"), "{out}");
    }

    #[test]
    fn optional_operation_probes_with_requires() {
        let out = emit(&allocator(), &opts()).unwrap().render();
        assert!(
            out.contains("if constexpr (requires { obj->realloc(p, nbytes); }) {"),
            "Missing probe:\n{out}"
        );
        assert!(out.contains("return nullptr;"), "{out}");
        assert!(out.contains("void* realloc(void* p, size_t nbytes); // [optional]"), "{out}");
    }

    #[test]
    fn indent_and_pragma() {
        let options = GenerateOptions {
            indent: Indent::Spaces(2),
            guard_style: Some(GuardStyle::PragmaOnce),
            header: false,
            ..opts()
        };
        let out = emit(&list(), &options).unwrap().render();
        assert!(out.starts_with("#pragma once\n"), "{out}");
        assert!(out.contains("\n  struct VTable {\n    T& (*at)"), "{out}");
    }

    #[test]
    fn rust_spellings_map_to_std_types() {
        assert_eq!(cpp_type_str(&ty("*mut u8")).unwrap(), "std::uint8_t*");
        assert_eq!(cpp_type_str(&ty("&usize")).unwrap(), "const std::size_t&");
        assert_eq!(cpp_type_str(&ty("char* const*")).unwrap(), "char* const*");
        assert_eq!(cpp_type_str(&ty("()")).unwrap(), "void");
        assert!(cpp_type_str(&ty("u128")).is_err());

        let spec = InterfaceSpec::new("Bytes").with_operation(
            OperationSpec::new("get")
                .with_param("i", ty("usize"))
                .returning(ty("u8")),
        );
        let out = emit(&spec, &opts()).unwrap().render();
        assert!(out.contains("#include <cstddef>\n#include <cstdint>"), "{out}");
    }

    #[test]
    fn target_checks() {
        let mut spec = InterfaceSpec::new("Box")
            .with_generic(GenericParam::new("Impl"))
            .with_generic(GenericParam::new("T").with_kind("Default + Clone"))
            .with_operation(OperationSpec::new("delete"))
            .with_operation(OperationSpec::new("vtbl"))
            .with_operation(OperationSpec::new("Box"))
            .with_operation(OperationSpec::new("put").with_param("obj", ty("T")));
        spec.imports = vec!["core::fmt".into()];
        let diags = check_cpp(&spec);
        let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();

        assert!(messages.iter().any(|m| m.contains("'Impl' collides")), "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("not a C++ template parameter kind")), "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("'delete' is a C++ keyword")), "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("generated member")), "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("constructor")), "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("'obj'")), "{messages:#?}");
        assert_eq!(diags.iter().filter(|d| !d.is_error()).count(), 1);
    }

    #[test]
    fn value_generics_are_template_parameters() {
        let spec = InterfaceSpec::new("Ring")
            .with_generic(GenericParam::new("N").with_kind("int"))
            .with_operation(OperationSpec::new("capacity").returning(ty("int")).read_only());
        assert!(check_cpp(&spec).is_empty());
        let out = emit(&spec, &opts()).unwrap().render();
        assert!(out.contains("template<int N>\nstruct Ring {"), "{out}");
        assert!(out.contains("template<int N, typename Impl>\nRing<N> make_ring(Impl* impl) {"), "{out}");
    }
}
