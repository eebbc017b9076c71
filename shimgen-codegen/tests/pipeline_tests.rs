//! End-to-end tests for parse → check → emit

use shimgen_codegen::{
    advisory, generate, generate_with_report, BindingMode, Diagnostic, FragmentKind, GenericParam,
    GenerateOptions, GuardStyle, InterfaceSpec, OperationSpec, Source, Target, TypeExpr,
};

const COUNTER_TOML: &str = r#"
name = "Counter"

[[operations]]
name = "get"
returns = "i32"
readonly = true

[[operations]]
name = "inc"
"#;

const LIST_IDL: &str = r#"
// Scenario C interface
interface List<T> {
    fn at(idx: i32) -> T&;
    readonly fn len() -> i32;
}
"#;

const ALLOCATOR_IDL: &str = r#"
import "<cstddef>";
import "types.hpp";
namespace mem;
guard macro:_ALLOCATOR_HPP_;

unbound interface Allocator {
    fn alloc(nbytes: usize) -> *mut u8;
    fn alloc_undef(nbytes: usize) -> *mut u8;
    optional fn realloc(p: *mut u8, nbytes: usize) -> *mut u8;
    fn free(p: *mut u8);
    fn free_all();
    readonly fn has_address(p: *const u8) -> bool;
}
"#;

fn rust() -> GenerateOptions {
    GenerateOptions::default()
}

fn cpp() -> GenerateOptions {
    GenerateOptions::for_target(Target::Cpp)
}

fn ty(s: &str) -> TypeExpr {
    TypeExpr::parse(s).unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_a_counter() {
    let out = generate(Source::Toml(COUNTER_TOML), &rust()).unwrap().render();

    let file = syn::parse_file(&out).unwrap_or_else(|e| panic!("invalid Rust: {e}\n{out}"));
    let table = file
        .items
        .iter()
        .find_map(|item| match item {
            syn::Item::Struct(s) if s.ident == "CounterVTable" => Some(s),
            _ => None,
        })
        .expect("CounterVTable missing");
    let fields: Vec<String> = table
        .fields
        .iter()
        .filter_map(|f| f.ident.as_ref().map(|i| i.to_string()))
        .collect();
    assert_eq!(fields, ["get", "inc"]);

    assert!(out.contains("pub fn get(&self) -> i32"), "{out}");
    assert!(out.contains("pub fn inc(&mut self)"), "{out}");
    assert!(out.contains("pub fn make_counter<'a, M>(data: &'a mut M)"), "{out}");
}

#[test]
fn test_scenario_b_duplicate_operation_never_emits() {
    let spec = InterfaceSpec::new("Counter")
        .with_operation(OperationSpec::new("get").returning(ty("i32")).read_only())
        .with_operation(OperationSpec::new("get").returning(ty("i32")).read_only());

    let err = generate(Source::Spec(spec), &rust()).unwrap_err();
    let Diagnostic::Check(diags) = &err else {
        panic!("expected a check failure, got {err}");
    };
    assert!(
        diags
            .iter()
            .any(|d| d.is_error() && d.message.contains("duplicate operation name 'get'")),
        "{err}"
    );
}

#[test]
fn test_scenario_b_from_text_fails_in_parser() {
    let toml = "name = \"Counter\"\n[[operations]]\nname = \"get\"\n[[operations]]\nname = \"get\"\n";
    let err = generate(Source::Toml(toml), &rust()).unwrap_err();
    assert!(matches!(&err, Diagnostic::Parse(p) if p.message.contains("duplicate")), "{err}");
}

#[test]
fn test_scenario_c_list_both_targets() {
    let rust_out = generate(Source::Idl(LIST_IDL), &rust()).unwrap().render();
    assert!(rust_out.contains("pub struct ListVTableFor<T, M>"), "{rust_out}");
    assert!(rust_out.contains("pub fn make_list<'a, T, M>"), "{rust_out}");

    let cpp_out = generate(Source::Idl(LIST_IDL), &cpp()).unwrap().render();
    assert!(cpp_out.contains("template<typename T>\nstruct List {"), "{cpp_out}");
    assert!(cpp_out.contains("std::int32_t len() const {"), "{cpp_out}");
}

#[test]
fn test_allocator_cpp_header() {
    let out = generate(Source::Idl(ALLOCATOR_IDL), &cpp()).unwrap().render();
    assert!(out.contains("#ifndef _ALLOCATOR_HPP_"), "{out}");
    assert!(out.contains("#include \"types.hpp\""), "{out}");
    assert!(out.contains("namespace mem {"), "{out}");
    assert!(out.contains("std::uint8_t* (*alloc)(void* impl, std::size_t nbytes);"), "{out}");
    assert!(out.contains("bool (*has_address)(const void* impl, const std::uint8_t* p);"), "{out}");
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn test_emission_is_deterministic() {
    for opts in [rust(), cpp()] {
        let a = generate(Source::Idl(ALLOCATOR_IDL), &opts).unwrap();
        let b = generate(Source::Idl(ALLOCATOR_IDL), &opts).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.render(), b.render());
    }
}

#[test]
fn test_advisory_round_trip() {
    for (src, opts) in [
        (Source::Idl(LIST_IDL), rust()),
        (Source::Idl(LIST_IDL), cpp()),
        (Source::Idl(ALLOCATOR_IDL), rust()),
        (Source::Idl(ALLOCATOR_IDL), cpp()),
    ] {
        let text = match &src {
            Source::Idl(t) => *t,
            _ => unreachable!(),
        };
        let spec = shimgen_codegen::parse::idl::parse(text).unwrap();
        let out = generate(src, &opts).unwrap().render();
        let listed = advisory::extract(&out);

        let expected: Vec<(&str, usize, bool)> = spec
            .operations
            .iter()
            .map(|op| (op.name.as_str(), op.arity(), op.is_optional()))
            .collect();
        let found: Vec<(&str, usize, bool)> = listed
            .iter()
            .map(|e| (e.name.as_str(), e.arity, e.optional))
            .collect();
        assert_eq!(found, expected, "{} target:\n{out}", opts.target);
    }
}

/// Unbound forwarders take the data reference first. Bound ones never do.
#[test]
fn test_binding_mode_invariant() {
    fn collect(items: &[syn::Item], handle: &str, out: &mut Vec<(String, Vec<String>)>) {
        for item in items {
            let imp = match item {
                syn::Item::Mod(m) => {
                    if let Some((_, inner)) = &m.content {
                        collect(inner, handle, out);
                    }
                    continue;
                }
                syn::Item::Impl(imp) if imp.trait_.is_none() => imp,
                _ => continue,
            };
            let syn::Type::Path(p) = &*imp.self_ty else { continue };
            if p.path.segments.last().map(|s| s.ident.to_string()) != Some(handle.to_string()) {
                continue;
            }
            for it in &imp.items {
                let syn::ImplItem::Fn(f) = it else { continue };
                let inputs = f
                    .sig
                    .inputs
                    .iter()
                    .filter_map(|arg| match arg {
                        syn::FnArg::Typed(t) => {
                            let ty = &t.ty;
                            Some(quote::quote!(#ty).to_string())
                        }
                        syn::FnArg::Receiver(_) => None,
                    })
                    .collect();
                out.push((f.sig.ident.to_string(), inputs));
            }
        }
    }

    fn forwarder_inputs(out: &str, handle: &str) -> Vec<(String, Vec<String>)> {
        let file = syn::parse_file(out).unwrap();
        let mut methods = Vec::new();
        collect(&file.items, handle, &mut methods);
        methods
    }

    let spec = shimgen_codegen::parse::idl::parse(ALLOCATOR_IDL).unwrap();
    let helpers = ["from_vtable", "from_raw_parts", "vtable", "same_type"];

    let unbound = generate(Source::Spec(spec.clone()), &rust()).unwrap().render();
    let methods = forwarder_inputs(&unbound, "Allocator");
    assert!(!methods.is_empty());
    for (name, inputs) in methods.iter().filter(|(n, _)| !helpers.contains(&n.as_str())) {
        assert!(
            inputs.first().is_some_and(|t| t.starts_with("AllocatorData")),
            "unbound '{name}' does not take data first: {inputs:?}"
        );
    }

    let bound_spec = InterfaceSpec {
        binding_mode: BindingMode::Bound,
        ..spec
    };
    let bound = generate(Source::Spec(bound_spec), &rust()).unwrap().render();
    for (name, inputs) in forwarder_inputs(&bound, "Allocator")
        .iter()
        .filter(|(n, _)| !helpers.contains(&n.as_str()))
    {
        assert!(
            inputs.iter().all(|t| !t.contains("AllocatorData")),
            "bound '{name}' exposes the data reference: {inputs:?}"
        );
    }
}

#[test]
fn test_checker_is_exhaustive() {
    let spec = InterfaceSpec::new("Bag")
        .with_operation(OperationSpec::new("put").with_param("data", ty("i32")))
        .with_operation(OperationSpec::new("peek").returning(ty("U&")))
        .with_operation(OperationSpec::new("first").returning(ty("i32&")).optional());

    let err = generate(Source::Spec(spec), &rust()).unwrap_err();
    let errors: Vec<_> = err
        .check_diagnostics()
        .iter()
        .filter(|d| d.is_error())
        .collect();
    assert!(errors.len() >= 3, "{err}");
    assert!(errors.iter().any(|d| d.location.starts_with("operations[0]")), "{err}");
    assert!(errors.iter().any(|d| d.location.starts_with("operations[1]")), "{err}");
    assert!(errors.iter().any(|d| d.location.starts_with("operations[2]")), "{err}");
}

#[test]
fn test_guard_styles() {
    let base = InterfaceSpec::new("Counter")
        .with_operation(OperationSpec::new("get").returning(ty("int")).read_only());

    let render = |guard: GuardStyle| {
        let opts = GenerateOptions {
            guard_style: Some(guard),
            header: false,
            ..cpp()
        };
        generate(Source::Spec(base.clone()), &opts).unwrap().render()
    };

    assert!(render(GuardStyle::PragmaOnce).starts_with("#pragma once\n"));

    let derived = render(GuardStyle::MacroGuard(String::new()));
    assert!(derived.starts_with("#ifndef COUNTER_INTERFACE_HPP_\n#define COUNTER_INTERFACE_HPP_\n"), "{derived}");
    assert!(derived.contains("#endif /* COUNTER_INTERFACE_HPP_ */"), "{derived}");

    let none = render(GuardStyle::None);
    assert!(!none.contains("#pragma") && !none.contains("#ifndef"), "{none}");
    assert!(none.starts_with("struct Counter {"), "{none}");
}

#[test]
fn test_options_do_not_change_semantics() {
    let plain = generate(Source::Idl(LIST_IDL), &cpp()).unwrap();
    let styled = generate(
        Source::Idl(LIST_IDL),
        &GenerateOptions {
            indent: "4".parse().unwrap(),
            guard_style: Some(GuardStyle::PragmaOnce),
            header: false,
            ..cpp()
        },
    )
    .unwrap();

    assert_eq!(
        advisory::extract(&plain.render()),
        advisory::extract(&styled.render())
    );
    assert_eq!(plain.kinds().collect::<Vec<_>>(), styled.kinds().collect::<Vec<_>>());
    assert!(styled.fragment(FragmentKind::DataReference).is_none());
}

#[test]
fn test_target_warning_is_reported_not_fatal() {
    let idl = "import \"<cstddef>\";\ninterface Measure { readonly fn size() -> usize; }";
    let report = generate_with_report(Source::Idl(idl), &rust()).unwrap();
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.message.contains("not a Rust path")),
        "{:?}",
        report.warnings
    );
}

#[test]
fn test_operation_named_like_table_constant_is_rejected() {
    let err = generate(Source::Idl("interface Foo { fn TABLE(); }"), &rust()).unwrap_err();
    let Diagnostic::Check(diags) = &err else {
        panic!("expected a check failure, got {err}");
    };
    assert!(
        diags
            .iter()
            .any(|d| d.is_error() && d.location == "operations[0].name"),
        "{err}"
    );
}

#[test]
fn test_optional_operation_may_return_option_of_reference() {
    let spec = InterfaceSpec::new("List")
        .with_generic(GenericParam::new("T"))
        .with_operation(OperationSpec::new("len").returning(ty("usize")).read_only())
        .with_operation(OperationSpec::new("front").returning(ty("Option<&T>")).optional());
    let out = generate(Source::Spec(spec), &rust()).unwrap().render();
    assert!(out.contains("fn front(&mut self) -> Option<&T> {"), "{out}");
    assert!(out.contains("::core::default::Default::default()"), "{out}");
}
