//! TOML front end
//!
//! ```toml
//! name = "List"
//! generics = ["T: typename"]
//! binding = "bound"
//!
//! [[operations]]
//! name = "at"
//! params = ["idx: int"]
//! returns = "T&"
//!
//! [[operations]]
//! name = "len"
//! returns = "int"
//! readonly = true
//! ```

use serde::Deserialize;

use super::{finish, line_col, parse_generic, parse_param, parse_type};
use crate::error::ParseDiagnostic;
use crate::model::{BindingMode, GuardStyle, InterfaceSpec, OperationSpec};
use crate::types::TypeExpr;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlInterface {
    name: String,
    #[serde(default)]
    generics: Vec<String>,
    #[serde(default)]
    binding: BindingMode,
    #[serde(default)]
    guard: GuardStyle,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    namespace: Vec<String>,
    #[serde(default)]
    operations: Vec<TomlOperation>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlOperation {
    name: String,
    #[serde(default)]
    params: Vec<String>,
    returns: Option<String>,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    optional: bool,
}

/// Parse a TOML interface definition.
pub fn parse(src: &str) -> Result<InterfaceSpec, ParseDiagnostic> {
    let raw: TomlInterface = ::toml::from_str(src).map_err(|e| {
        let message = e.message().trim().to_string();
        match e.span() {
            Some(span) => {
                let (line, col) = line_col(src, span.start);
                ParseDiagnostic::new(src.get(span).unwrap_or_default(), message).at(line, col)
            }
            None => ParseDiagnostic::new("", message),
        }
    })?;

    let locate = |diag: ParseDiagnostic, needle: &str| match src.find(needle) {
        Some(offset) if diag.line.is_none() => {
            let (line, col) = line_col(src, offset);
            diag.at(line, col)
        }
        _ => diag,
    };

    if raw.name.trim().is_empty() {
        return Err(locate(
            ParseDiagnostic::new("name", "interface name must not be empty"),
            "name",
        ));
    }

    let mut spec = InterfaceSpec::new(raw.name.trim())
        .with_binding(raw.binding)
        .with_guard(raw.guard);
    spec.imports = raw.imports;
    spec.namespace = raw.namespace;

    for decl in &raw.generics {
        let param = parse_generic(decl).map_err(|d| locate(d, decl.as_str()))?;
        if spec.declares_generic(&param.name) {
            return Err(locate(
                ParseDiagnostic::new(decl, format!("duplicate generic parameter '{}'", param.name)),
                decl.as_str(),
            ));
        }
        spec = spec.with_generic(param);
    }

    // Operation `i` is searched for from the i-th `[[operations]]` header, or
    // past the previous match for inline tables.
    let headers = table_headers(src, "[[operations]]");
    let mut cursor = 0;
    let mut positions = Vec::with_capacity(raw.operations.len());
    for (idx, raw_op) in raw.operations.iter().enumerate() {
        let needle = format!("\"{}\"", raw_op.name);
        let from = headers.get(idx).copied().unwrap_or(cursor);
        let found = src.get(from..).and_then(|rest| rest.find(&needle)).map(|o| from + o);
        if let Some(offset) = found {
            cursor = offset + needle.len();
        }
        positions.push(found.map(|o| line_col(src, o)).unwrap_or((0, 0)));

        let mut op = OperationSpec::new(raw_op.name.trim());
        for decl in &raw_op.params {
            op.params.push(parse_param(decl).map_err(|d| locate(d, decl.as_str()))?);
        }
        op.return_type = match raw_op.returns.as_deref() {
            Some(ret) => parse_type(ret).map_err(|d| locate(d, ret))?,
            None => TypeExpr::Unit,
        };
        if raw_op.readonly {
            op = op.read_only();
        }
        if raw_op.optional {
            op = op.optional();
        }
        spec = spec.with_operation(op);
    }

    // Unlocated operations report no position rather than a bogus 0:0.
    if positions.iter().any(|&p| p == (0, 0)) {
        positions.clear();
    }
    finish(spec, &positions)
}

/// Byte offsets of every line consisting of exactly `header`.
fn table_headers(src: &str, header: &str) -> Vec<usize> {
    let mut offset = 0;
    let mut out = Vec::new();
    for line in src.split_inclusive('\n') {
        if line.trim() == header {
            out.push(offset);
        }
        offset += line.len();
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenericParam, Mutability, Optionality};

    const LIST: &str = r#"
name = "List"
generics = ["T: typename"]

[[operations]]
name = "at"
params = ["idx: int"]
returns = "T&"

[[operations]]
name = "len"
returns = "int"
readonly = true
"#;

    #[test]
    fn parses_generic_list() {
        let spec = parse(LIST).unwrap();
        assert_eq!(spec.name, "List");
        assert_eq!(
            spec.generic_params,
            vec![GenericParam::new("T").with_kind("typename")]
        );
        assert_eq!(spec.binding_mode, BindingMode::Bound);
        assert_eq!(spec.guard_style, GuardStyle::None);

        let at = &spec.operations[0];
        assert_eq!(at.params[0].name, "idx");
        assert_eq!(at.return_type.to_string(), "T&");
        assert_eq!(at.mutability, Mutability::Mutating);

        let len = &spec.operations[1];
        assert!(len.params.is_empty());
        assert_eq!(len.mutability, Mutability::ReadOnly);
        assert_eq!(len.optionality, Optionality::Required);
    }

    #[test]
    fn envelope_keys() {
        let spec = parse(
            r#"
name = "Allocator"
binding = "unbound"
guard = "macro:_ALLOC_HPP_"
imports = ["<cstddef>"]
namespace = ["mem", "detail"]

[[operations]]
name = "alloc"
params = ["nbytes: size_t"]
returns = "void*"

[[operations]]
name = "realloc"
params = ["p: void*", "nbytes: size_t"]
returns = "void*"
optional = true
"#,
        )
        .unwrap();
        assert_eq!(spec.binding_mode, BindingMode::Unbound);
        assert_eq!(spec.guard_style, GuardStyle::MacroGuard("_ALLOC_HPP_".into()));
        assert_eq!(spec.imports, ["<cstddef>"]);
        assert_eq!(spec.namespace, ["mem", "detail"]);
        assert!(spec.operations[1].is_optional());
    }

    #[test]
    fn duplicate_operation_is_located() {
        let src = r#"name = "Counter"

[[operations]]
name = "get"

[[operations]]
name = "get"
"#;
        let err = parse(src).unwrap_err();
        assert_eq!(err.message, "duplicate operation name 'get'");
        // The repeat, not the first declaration.
        assert_eq!((err.line, err.column), (Some(7), Some(8)));
    }

    #[test]
    fn duplicate_inline_operation_is_located() {
        let src = "name = \"Counter\"\noperations = [\n  { name = \"get\" },\n  { name = \"get\" },\n]\n";
        let err = parse(src).unwrap_err();
        assert_eq!(err.message, "duplicate operation name 'get'");
        assert_eq!(err.line, Some(4), "{err}");
    }

    #[test]
    fn table_headers_skip_other_tables() {
        let src = "name = \"X\"\n[[operations]]\nname = \"a\"\n\n  [[operations]]  \n";
        assert_eq!(table_headers(src, "[[operations]]"), [11, 38]);
    }

    #[test]
    fn unknown_generic_fails_fast() {
        let src = r#"
name = "List"
generics = ["T"]

[[operations]]
name = "at"
returns = "U&"
"#;
        let err = parse(src).unwrap_err();
        assert!(
            err.message
                .contains("unknown generic parameter 'U' referenced in return type"),
            "{err}"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("name = \"X\"\ncolour = \"red\"\n").unwrap_err();
        assert!(err.message.contains("colour"), "{err}");
    }

    #[test]
    fn malformed_param_points_at_declaration() {
        let src = "name = \"X\"\n[[operations]]\nname = \"f\"\nparams = [\"nocolon\"]\n";
        let err = parse(src).unwrap_err();
        assert_eq!(err.fragment, "nocolon");
        assert_eq!(err.line, Some(4));
    }

    #[test]
    fn bad_guard_string() {
        let err = parse("name = \"X\"\nguard = \"sometimes\"\n").unwrap_err();
        assert!(err.message.contains("unknown guard style"), "{err}");
    }
}
