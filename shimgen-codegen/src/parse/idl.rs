//! IDL front end
//!
//! A compact interface syntax:
//!
//! ```text
//! import "<cstddef>";
//! namespace mem::detail;
//! guard pragma;
//!
//! unbound interface Allocator {
//!     fn alloc(nbytes: usize) -> *mut u8;
//!     optional fn realloc(p: *mut u8, nbytes: usize) -> *mut u8;
//!     readonly fn has_address(p: *const u8) -> bool;
//! }
//! ```
//!
//! `//` comments may appear wherever whitespace may. Type tokens are taken
//! verbatim up to the next delimiter at bracket depth zero and handed to
//! [`TypeExpr::parse`](crate::types::TypeExpr::parse).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, char, multispace1, satisfy},
    combinator::{cut, eof, fail, not, opt, recognize, value},
    error::{context, ErrorKind, ParseError, VerboseError, VerboseErrorKind},
    multi::{many0, many0_count, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{finish, line_col, parse_generic, parse_type};
use crate::error::ParseDiagnostic;
use crate::model::{BindingMode, GuardStyle, InterfaceSpec, OperationSpec};

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// ── Public API ───────────────────────────────────────────────────────────────

/// Parse an IDL interface definition.
pub fn parse(src: &str) -> Result<InterfaceSpec, ParseDiagnostic> {
    match file(src) {
        Ok((_, (headers, iface))) => lower(src, headers, iface),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(to_diagnostic(src, e)),
        Err(nom::Err::Incomplete(_)) => Err(ParseDiagnostic::new("", "incomplete input")),
    }
}

// ── Raw syntax tree ──────────────────────────────────────────────────────────

#[derive(Debug)]
enum Header<'a> {
    Import(&'a str),
    Namespace(Vec<&'a str>),
    Guard(&'a str),
}

#[derive(Debug)]
struct RawInterface<'a> {
    binding: Option<BindingMode>,
    name: &'a str,
    generics: Vec<&'a str>,
    ops: Vec<RawOp<'a>>,
}

#[derive(Debug)]
struct RawOp<'a> {
    name: &'a str,
    params: Vec<(&'a str, &'a str)>,
    ret: Option<&'a str>,
    readonly: bool,
    optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    Optional,
    ReadOnly,
}

// ── Lexical helpers ──────────────────────────────────────────────────────────

/// Whitespace and `//` comments.
fn sp(i: &str) -> Res<'_, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            preceded(tag("//"), take_while(|c| c != '\n')),
        ))),
    )(i)
}

fn ident(i: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(i)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag(kw), not(satisfy(|c: char| c.is_alphanumeric() || c == '_')))
}

fn semicolon(i: &str) -> Res<'_, char> {
    cut(context("expected ';'", preceded(sp, char(';'))))(i)
}

/// A type token running up to the first `stops` character at bracket depth
/// zero. `;`, `{` and `}` always end a token.
fn type_token<'a>(stops: &'static [char]) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    move |i: &'a str| {
        let mut depth = 0usize;
        let mut end = i.len();
        for (idx, c) in i.char_indices() {
            if matches!(c, ';' | '{' | '}') || (depth == 0 && stops.contains(&c)) {
                end = idx;
                break;
            }
            match c {
                '<' | '(' => depth += 1,
                '>' | ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        let token = i[..end].trim_end();
        if token.is_empty() {
            return Err(nom::Err::Error(VerboseError::from_error_kind(
                i,
                ErrorKind::TakeWhile1,
            )));
        }
        Ok((&i[token.len()..], token))
    }
}

// ── Grammar ──────────────────────────────────────────────────────────────────

fn file(i: &str) -> Res<'_, (Vec<(&str, Header<'_>)>, RawInterface<'_>)> {
    let (i, _) = sp(i)?;
    let (i, headers) = many0(terminated(header, sp))(i)?;
    let (i, iface) = context("expected interface declaration", interface)(i)?;
    let (i, _) = sp(i)?;
    let (i, _) = cut(context("only one interface may be declared per source", eof))(i)?;
    Ok((i, (headers, iface)))
}

/// A header item, paired with the input it started at.
fn header(i: &str) -> Res<'_, (&str, Header<'_>)> {
    let start = i;
    let (i, h) = alt((import, namespace, guard))(i)?;
    Ok((i, (start, h)))
}

fn import(i: &str) -> Res<'_, Header<'_>> {
    let (i, _) = keyword("import")(i)?;
    let (i, path) = cut(context(
        "expected quoted import path",
        preceded(
            sp,
            delimited(char('"'), take_till(|c| c == '"' || c == '\n'), char('"')),
        ),
    ))(i)?;
    let (i, _) = semicolon(i)?;
    Ok((i, Header::Import(path)))
}

fn namespace(i: &str) -> Res<'_, Header<'_>> {
    let (i, _) = keyword("namespace")(i)?;
    let (i, path) = cut(context(
        "expected namespace path",
        preceded(sp, separated_list1(tag("::"), ident)),
    ))(i)?;
    let (i, _) = semicolon(i)?;
    Ok((i, Header::Namespace(path)))
}

fn guard(i: &str) -> Res<'_, Header<'_>> {
    let (i, _) = keyword("guard")(i)?;
    let (i, style) = cut(context(
        "expected guard style",
        preceded(sp, take_while1(|c: char| !c.is_whitespace() && c != ';')),
    ))(i)?;
    let (i, _) = semicolon(i)?;
    Ok((i, Header::Guard(style)))
}

fn binding_mode(i: &str) -> Res<'_, BindingMode> {
    alt((
        value(BindingMode::Bound, keyword("bound")),
        value(BindingMode::Unbound, keyword("unbound")),
    ))(i)
}

fn interface(i: &str) -> Res<'_, RawInterface<'_>> {
    let (i, binding) = opt(terminated(binding_mode, sp))(i)?;
    let (i, _) = keyword("interface")(i)?;
    let (i, name) = cut(context("expected interface name", preceded(sp, ident)))(i)?;
    let (i, generics) = opt(preceded(sp, generic_clause))(i)?;
    let (i, _) = cut(context(
        "expected '{' to open the operation list",
        preceded(sp, char('{')),
    ))(i)?;
    let (i, ops) = many0(preceded(sp, operation))(i)?;
    let (i, _) = sp(i)?;
    if !i.is_empty() && !i.starts_with('}') {
        cut(context("expected operation declaration", fail::<_, (), _>))(i)?;
    }
    let (i, _) = cut(context("unterminated operation list", char('}')))(i)?;
    let (i, _) = opt(preceded(sp, char(';')))(i)?;

    Ok((
        i,
        RawInterface {
            binding,
            name,
            generics: generics.unwrap_or_default(),
            ops,
        },
    ))
}

/// `<T, U: kind>`
fn generic_clause(i: &str) -> Res<'_, Vec<&str>> {
    let (i, _) = char('<')(i)?;
    cut(terminated(
        separated_list1(
            preceded(sp, char(',')),
            context("expected generic parameter", preceded(sp, generic_decl)),
        ),
        context("expected '>' after generic parameters", preceded(sp, char('>'))),
    ))(i)
}

fn generic_decl(i: &str) -> Res<'_, &str> {
    recognize(pair(
        ident,
        opt(tuple((sp, char(':'), sp, type_token(&[',', '>'])))),
    ))(i)
}

fn modifier(i: &str) -> Res<'_, Modifier> {
    alt((
        value(Modifier::Optional, keyword("optional")),
        value(Modifier::ReadOnly, keyword("readonly")),
    ))(i)
}

fn operation(i: &str) -> Res<'_, RawOp<'_>> {
    let (i, mods) = many0(terminated(modifier, sp))(i)?;
    let (i, _) = if mods.is_empty() {
        keyword("fn")(i)?
    } else {
        cut(context("expected 'fn' after modifiers", keyword("fn")))(i)?
    };
    let (i, name) = cut(context("expected operation name", preceded(sp, ident)))(i)?;
    let (i, _) = cut(context(
        "expected '(' after operation name",
        preceded(sp, char('(')),
    ))(i)?;
    let (i, params) = separated_list0(preceded(sp, char(',')), preceded(sp, param))(i)?;
    let (i, _) = cut(context(
        "expected ')' after parameters",
        preceded(sp, char(')')),
    ))(i)?;
    let (i, ret) = opt(preceded(
        preceded(sp, tag("->")),
        cut(context("expected return type", preceded(sp, type_token(&[';'])))),
    ))(i)?;
    let (i, _) = cut(context(
        "expected ';' after operation",
        preceded(sp, char(';')),
    ))(i)?;

    Ok((
        i,
        RawOp {
            name,
            params,
            ret,
            readonly: mods.contains(&Modifier::ReadOnly),
            optional: mods.contains(&Modifier::Optional),
        },
    ))
}

/// `name: type`
fn param(i: &str) -> Res<'_, (&str, &str)> {
    let (i, name) = ident(i)?;
    let (i, _) = cut(context(
        "expected ':' after parameter name",
        preceded(sp, char(':')),
    ))(i)?;
    let (i, ty) = cut(context(
        "expected parameter type",
        preceded(sp, type_token(&[',', ')'])),
    ))(i)?;
    Ok((i, (name, ty)))
}

// ── Lowering ─────────────────────────────────────────────────────────────────

fn lower(
    src: &str,
    headers: Vec<(&str, Header<'_>)>,
    iface: RawInterface<'_>,
) -> Result<InterfaceSpec, ParseDiagnostic> {
    let at = |part: &str, diag: ParseDiagnostic| {
        let (line, col) = line_col(src, offset_in(src, part));
        diag.at(line, col)
    };

    let mut spec =
        InterfaceSpec::new(iface.name).with_binding(iface.binding.unwrap_or_default());

    let mut saw_namespace = false;
    let mut saw_guard = false;
    for (start, h) in headers {
        match h {
            Header::Import(path) => spec.imports.push(path.to_string()),
            Header::Namespace(path) => {
                if saw_namespace {
                    return Err(at(
                        start,
                        ParseDiagnostic::new(start, "duplicate namespace declaration"),
                    ));
                }
                saw_namespace = true;
                spec.namespace = path.into_iter().map(str::to_string).collect();
            }
            Header::Guard(style) => {
                if saw_guard {
                    return Err(at(
                        start,
                        ParseDiagnostic::new(start, "duplicate guard declaration"),
                    ));
                }
                saw_guard = true;
                spec.guard_style = style
                    .parse::<GuardStyle>()
                    .map_err(|message: String| at(style, ParseDiagnostic::new(style, message)))?;
            }
        }
    }

    for decl in iface.generics {
        let param = parse_generic(decl).map_err(|d| at(decl, d))?;
        if spec.declares_generic(&param.name) {
            return Err(at(
                decl,
                ParseDiagnostic::new(decl, format!("duplicate generic parameter '{}'", param.name)),
            ));
        }
        spec = spec.with_generic(param);
    }

    let mut positions = Vec::with_capacity(iface.ops.len());
    for raw in iface.ops {
        positions.push(line_col(src, offset_in(src, raw.name)));

        let mut op = OperationSpec::new(raw.name);
        for (name, ty) in raw.params {
            op = op.with_param(name, parse_type(ty).map_err(|d| at(ty, d))?);
        }
        if let Some(ret) = raw.ret {
            op = op.returning(parse_type(ret).map_err(|d| at(ret, d))?);
        }
        if raw.readonly {
            op = op.read_only();
        }
        if raw.optional {
            op = op.optional();
        }
        spec = spec.with_operation(op);
    }

    finish(spec, &positions)
}

/// Byte offset of `part`, a sub-slice of `src`.
fn offset_in(src: &str, part: &str) -> usize {
    (part.as_ptr() as usize).saturating_sub(src.as_ptr() as usize)
}

fn to_diagnostic(src: &str, err: VerboseError<&str>) -> ParseDiagnostic {
    // The first context entry is the innermost, most specific one.
    let located = err.errors.iter().find_map(|(rest, kind)| match kind {
        VerboseErrorKind::Context(ctx) => Some((*rest, (*ctx).to_string())),
        _ => None,
    });
    let (rest, message) = match located {
        Some(found) => found,
        None => match err.errors.first() {
            Some((rest, VerboseErrorKind::Char(c))) => (*rest, format!("expected '{c}'")),
            Some((rest, VerboseErrorKind::Nom(kind))) => {
                (*rest, format!("unexpected input ({})", kind.description()))
            }
            _ => (src, "invalid interface definition".to_string()),
        },
    };

    let rest = rest.trim_start();
    let (line, col) = line_col(src, src.len() - rest.len());
    let fragment = if rest.is_empty() { "<end of input>" } else { rest };
    ParseDiagnostic::new(fragment, message).at(line, col)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenericParam;

    const ALLOCATOR: &str = r#"
import "<cstddef>";
namespace mem::detail;
guard pragma;

// Allocation backend.
unbound interface Allocator {
    fn alloc(nbytes: usize) -> *mut u8;
    optional fn realloc(p: *mut u8, nbytes: usize) -> *mut u8;
    fn free(p: *mut u8);
    readonly fn has_address(p: *const u8) -> bool;
}
"#;

    #[test]
    fn parses_unbound_allocator() {
        let spec = parse(ALLOCATOR).unwrap();
        assert_eq!(spec.name, "Allocator");
        assert_eq!(spec.binding_mode, BindingMode::Unbound);
        assert_eq!(spec.guard_style, GuardStyle::PragmaOnce);
        assert_eq!(spec.imports, ["<cstddef>"]);
        assert_eq!(spec.namespace, ["mem", "detail"]);

        let names: Vec<_> = spec.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["alloc", "realloc", "free", "has_address"]);

        let realloc = &spec.operations[1];
        assert!(realloc.is_optional());
        assert_eq!(realloc.arity(), 2);
        assert_eq!(realloc.return_type.to_string(), "u8*");

        assert!(spec.operations[2].return_type.is_unit());
        assert!(spec.operations[3].is_read_only());
    }

    #[test]
    fn parses_generics_and_comments() {
        let spec = parse(
            "interface List<T: typename> { // trailing\n\
             \tfn at(idx: int) -> T&;\n\
             \treadonly fn len() -> int; }",
        )
        .unwrap();
        assert_eq!(spec.binding_mode, BindingMode::Bound);
        assert_eq!(
            spec.generic_params,
            vec![GenericParam::new("T").with_kind("typename")]
        );
        assert_eq!(spec.operations[0].return_type.to_string(), "T&");
    }

    #[test]
    fn nested_generic_types_in_params() {
        let spec = parse(
            "interface Store<K, V> { fn put(key: K, value: Map<K, Vec<V>>); fn size() -> usize; }",
        )
        .unwrap();
        let put = &spec.operations[0];
        assert_eq!(put.params[1].ty.to_string(), "Map<K, Vec<V>>");
    }

    #[test]
    fn unterminated_operation_list() {
        let err = parse("interface A {\n    fn a();\n").unwrap_err();
        assert_eq!(err.message, "unterminated operation list");
        assert_eq!(err.line, Some(3));
        assert_eq!(err.fragment, "<end of input>");
    }

    #[test]
    fn malformed_operation_is_not_an_unterminated_list() {
        let err = parse("interface Foo {\n  fn a();\n  fnx b();\n}").unwrap_err();
        assert_eq!(err.message, "expected operation declaration");
        assert_eq!((err.line, err.column), (Some(3), Some(3)));
        assert!(err.fragment.starts_with("fnx b();"), "{err}");
    }

    #[test]
    fn missing_closing_paren_is_located() {
        let err = parse("interface A { fn a(x: i32; }").unwrap_err();
        assert_eq!(err.message, "expected ')' after parameters");
        assert_eq!((err.line, err.column), (Some(1), Some(26)));
    }

    #[test]
    fn duplicate_operation_points_at_second() {
        let err = parse("interface C {\n  fn get() -> i32;\n  fn get() -> i32;\n}").unwrap_err();
        assert_eq!(err.message, "duplicate operation name 'get'");
        assert_eq!((err.line, err.column), (Some(3), Some(6)));
    }

    #[test]
    fn unknown_generic_reference() {
        let err = parse("interface L<T> { fn at(i: i32) -> U&; }").unwrap_err();
        assert_eq!(
            err.message,
            "unknown generic parameter 'U' referenced in return type"
        );
    }

    #[test]
    fn malformed_type_token() {
        let err = parse("interface A {\n  fn f() -> Vec<i32;\n}").unwrap_err();
        assert!(err.message.contains("malformed type"), "{err}");
        assert_eq!(err.fragment, "Vec<i32");
        assert_eq!((err.line, err.column), (Some(2), Some(13)));
    }

    #[test]
    fn modifiers_require_fn() {
        let err = parse("interface A { readonly get() -> i32; }").unwrap_err();
        assert_eq!(err.message, "expected 'fn' after modifiers");
    }

    #[test]
    fn one_interface_per_source() {
        let err = parse("interface A { }\ninterface B { }").unwrap_err();
        assert!(err.message.contains("only one interface"), "{err}");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn bad_guard_style() {
        let err = parse("guard sometimes;\ninterface A { }").unwrap_err();
        assert!(err.message.contains("unknown guard style"), "{err}");
        assert_eq!((err.line, err.column), (Some(1), Some(7)));
    }

    #[test]
    fn deeply_nested_type_is_a_diagnostic() {
        let deep = format!("{}i32{}", "Vec<".repeat(100), ">".repeat(100));
        let err = parse(&format!("interface A {{ fn f(x: {deep}); }}")).unwrap_err();
        assert!(err.message.contains("nests deeper than"), "{err}");
    }
}
