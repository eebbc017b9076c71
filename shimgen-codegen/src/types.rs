//! Type tokens
//!
//! Parameter and return types are written as free-form tokens in the
//! interface specification. They are parsed into a small [`TypeExpr`] tree so
//! the checker can find generic references and each emitter can render them
//! in its own target syntax.
//!
//! Both C++-style suffix qualifiers (`T&`, `const char*`, `void*`) and
//! Rust-style prefix qualifiers (`&mut T`, `*const u8`, `()`) are accepted.

use std::fmt;

use thiserror::Error;

// ── Type expression ──────────────────────────────────────────────────────────

/// A parsed type token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// `void` / `()`.
    Unit,
    /// A (possibly qualified, possibly generic) named type, e.g. `i32`,
    /// `std::string`, `Vec<i32, 8>`.
    Named { path: Vec<String>, args: Vec<TypeArg> },
    /// `T&` / `&mut T` (mutable) or `const T&` / `&T` (shared).
    Ref { mutable: bool, inner: Box<TypeExpr> },
    /// `T*` / `*mut T` (mutable) or `const T*` / `*const T` (shared).
    Ptr { mutable: bool, inner: Box<TypeExpr> },
}

/// One argument inside `<...>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    Type(TypeExpr),
    /// An integer constant, e.g. the `8` in `Vec<i32, 8>`.
    Const(String),
}

/// Error raised for a malformed type token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed type '{token}': {message}")]
pub struct TypeParseError {
    /// The full type token as written.
    pub token: String,
    /// What went wrong.
    pub message: String,
}

impl TypeExpr {
    /// Parse a type token.
    pub fn parse(token: &str) -> Result<Self, TypeParseError> {
        let fail = |message: String| TypeParseError {
            token: token.trim().to_string(),
            message,
        };

        let lexed = lex(token).map_err(fail)?;
        if lexed.is_empty() {
            return Err(fail("empty type".to_string()));
        }
        let mut parser = TypeParser {
            toks: &lexed,
            pos: 0,
            depth: 0,
        };
        let ty = parser.parse_type().map_err(fail)?;
        if let Some(extra) = parser.peek() {
            return Err(fail(format!("unexpected '{extra}' after type")));
        }
        Ok(ty)
    }

    /// A single-segment named type without arguments, e.g. `T` or `i32`.
    pub fn named(name: &str) -> Self {
        TypeExpr::Named {
            path: vec![name.to_string()],
            args: Vec::new(),
        }
    }

    fn ptr(mutable: bool, inner: TypeExpr) -> Self {
        TypeExpr::Ptr {
            mutable,
            inner: Box::new(inner),
        }
    }

    fn reference(mutable: bool, inner: TypeExpr) -> Self {
        TypeExpr::Ref {
            mutable,
            inner: Box::new(inner),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, TypeExpr::Unit)
    }

    /// `true` for `T&`, `const T&`, `&T` and `&mut T`. References nested in
    /// type arguments or behind pointers do not count.
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeExpr::Ref { .. })
    }

    /// Names of every single-segment, argument-free named type in the
    /// expression, in order of appearance. These are the candidates for
    /// generic-parameter references.
    pub fn simple_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_simple_names(&mut out);
        out
    }

    fn collect_simple_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Unit => {}
            TypeExpr::Ref { inner, .. } | TypeExpr::Ptr { inner, .. } => {
                inner.collect_simple_names(out)
            }
            TypeExpr::Named { path, args } => {
                if path.len() == 1 && args.is_empty() {
                    out.push(&path[0]);
                }
                for arg in args {
                    if let TypeArg::Type(t) = arg {
                        t.collect_simple_names(out);
                    }
                }
            }
        }
    }

    /// `true` if `name` is referenced as a simple named type.
    pub fn mentions(&self, name: &str) -> bool {
        self.simple_names().contains(&name)
    }
}

/// `true` for identifiers shaped like a type parameter: one uppercase ASCII
/// letter optionally followed by digits (`T`, `U`, `K2`).
pub fn looks_like_type_param(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// `true` for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Canonical rendering in the declarative (C-family) notation.
impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Unit => write!(f, "void"),
            TypeExpr::Named { path, args } => {
                write!(f, "{}", path.join("::"))?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExpr::Ref { mutable, inner } => {
                if *mutable {
                    write!(f, "{inner}&")
                } else {
                    write!(f, "const {inner}&")
                }
            }
            TypeExpr::Ptr { mutable, inner } => {
                if *mutable {
                    write!(f, "{inner}*")
                } else {
                    write!(f, "const {inner}*")
                }
            }
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Type(t) => write!(f, "{t}"),
            TypeArg::Const(c) => write!(f, "{c}"),
        }
    }
}

// ── Lexer ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Int(String),
    PathSep,
    Lt,
    Gt,
    Comma,
    Amp,
    Star,
    LParen,
    RParen,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Ident(s) | Tok::Int(s) => write!(f, "{s}"),
            Tok::PathSep => write!(f, "::"),
            Tok::Lt => write!(f, "<"),
            Tok::Gt => write!(f, ">"),
            Tok::Comma => write!(f, ","),
            Tok::Amp => write!(f, "&"),
            Tok::Star => write!(f, "*"),
            Tok::LParen => write!(f, "("),
            Tok::RParen => write!(f, ")"),
        }
    }
}

fn lex(src: &str) -> Result<Vec<Tok>, String> {
    let mut toks = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '<' => toks.push(Tok::Lt),
            '>' => toks.push(Tok::Gt),
            ',' => toks.push(Tok::Comma),
            '&' => {
                if matches!(chars.peek(), Some((_, '&'))) {
                    return Err("rvalue references are not supported".to_string());
                }
                toks.push(Tok::Amp)
            }
            '*' => toks.push(Tok::Star),
            '(' => toks.push(Tok::LParen),
            ')' => toks.push(Tok::RParen),
            ':' => match chars.next() {
                Some((_, ':')) => toks.push(Tok::PathSep),
                _ => return Err("expected '::'".to_string()),
            },
            c if c.is_ascii_digit() => {
                let mut end = start + c.len_utf8();
                while let Some((i, d)) = chars.peek().copied() {
                    if d.is_ascii_digit() {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                toks.push(Tok::Int(src[start..end].to_string()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((i, d)) = chars.peek().copied() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                toks.push(Tok::Ident(src[start..end].to_string()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(toks)
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// Words that combine into one C primitive, e.g. `unsigned long long`.
const C_PRIMITIVE_WORDS: &[&str] = &[
    "unsigned", "signed", "short", "long", "int", "char", "float", "double",
];

/// Deepest accepted nesting of type arguments, references and pointers.
pub const MAX_TYPE_DEPTH: usize = 32;

fn too_deep() -> String {
    format!("type nests deeper than {MAX_TYPE_DEPTH} levels")
}

struct TypeParser<'t> {
    toks: &'t [Tok],
    pos: usize,
    /// Enclosing type layers of the token being parsed.
    depth: usize,
}

impl<'t> TypeParser<'t> {
    fn peek(&self) -> Option<&'t Tok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'t Tok> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: &Tok) -> Result<(), String> {
        match self.bump() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(format!("expected '{want}', found '{t}'")),
            None => Err(format!("expected '{want}', found end of type")),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        self.enter()?;
        let ty = self.parse_prefixed();
        self.depth -= 1;
        ty
    }

    fn enter(&mut self) -> Result<(), String> {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(too_deep());
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_prefixed(&mut self) -> Result<TypeExpr, String> {
        match self.peek() {
            // Rust-style prefix forms.
            Some(Tok::Amp) => {
                self.pos += 1;
                let mutable = self.eat_ident("mut");
                Ok(TypeExpr::reference(mutable, self.parse_type()?))
            }
            Some(Tok::Star) => {
                self.pos += 1;
                let mutable = if self.eat_ident("mut") {
                    true
                } else if self.eat_ident("const") {
                    false
                } else {
                    return Err("raw pointer needs 'const' or 'mut'".to_string());
                };
                Ok(TypeExpr::ptr(mutable, self.parse_type()?))
            }
            _ => self.parse_qualified(),
        }
    }

    /// `{const} base {const} { (* | &) {const} }`
    fn parse_qualified(&mut self) -> Result<TypeExpr, String> {
        let mut is_const = false;
        while self.eat_ident("const") {
            is_const = true;
        }
        let mut ty = self.parse_base()?;
        while self.eat_ident("const") {
            is_const = true;
        }

        let mut layers = 0;
        loop {
            let mutable = !is_const;
            match self.peek() {
                Some(Tok::Star) => ty = TypeExpr::ptr(mutable, ty),
                Some(Tok::Amp) => ty = TypeExpr::reference(mutable, ty),
                Some(Tok::Ident(w)) if w == "const" => {
                    self.pos += 1;
                    is_const = true;
                    continue;
                }
                _ => break,
            }
            self.pos += 1;
            is_const = false;
            layers += 1;
            if self.depth + layers > MAX_TYPE_DEPTH {
                return Err(too_deep());
            }
        }

        Ok(ty)
    }

    fn parse_base(&mut self) -> Result<TypeExpr, String> {
        match self.bump() {
            Some(Tok::LParen) => {
                self.expect(&Tok::RParen)?;
                Ok(TypeExpr::Unit)
            }
            Some(Tok::Ident(w)) if w == "void" => Ok(TypeExpr::Unit),
            Some(Tok::Ident(w)) if w == "mut" || w == "const" => {
                Err(format!("misplaced qualifier '{w}'"))
            }
            Some(Tok::Ident(w)) if C_PRIMITIVE_WORDS.contains(&w.as_str()) => {
                let mut words = vec![w.clone()];
                while let Some(Tok::Ident(next)) = self.peek() {
                    if !C_PRIMITIVE_WORDS.contains(&next.as_str()) {
                        break;
                    }
                    words.push(next.clone());
                    self.pos += 1;
                }
                Ok(TypeExpr::Named {
                    path: vec![words.join(" ")],
                    args: Vec::new(),
                })
            }
            Some(Tok::Ident(first)) => {
                let mut path = vec![first.clone()];
                while matches!(self.peek(), Some(Tok::PathSep)) {
                    self.pos += 1;
                    match self.bump() {
                        Some(Tok::Ident(seg)) => path.push(seg.clone()),
                        _ => return Err("expected identifier after '::'".to_string()),
                    }
                }
                let args = if matches!(self.peek(), Some(Tok::Lt)) {
                    self.pos += 1;
                    self.parse_args()?
                } else {
                    Vec::new()
                };
                Ok(TypeExpr::Named { path, args })
            }
            Some(tok) => Err(format!("unexpected '{tok}'")),
            None => Err("unexpected end of type".to_string()),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<TypeArg>, String> {
        let mut args = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Gt) if args.is_empty() => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(Tok::Int(n)) => {
                    self.pos += 1;
                    args.push(TypeArg::Const(n.clone()));
                }
                _ => args.push(TypeArg::Type(self.parse_type()?)),
            }
            match self.bump() {
                Some(Tok::Comma) => continue,
                Some(Tok::Gt) => return Ok(args),
                Some(t) => return Err(format!("expected ',' or '>', found '{t}'")),
                None => return Err("unterminated generic argument list".to_string()),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn named(n: &str) -> TypeExpr {
        TypeExpr::named(n)
    }

    #[test]
    fn cpp_reference_forms() {
        assert_eq!(
            TypeExpr::parse("T&").unwrap(),
            TypeExpr::Ref {
                mutable: true,
                inner: Box::new(named("T"))
            }
        );
        assert_eq!(
            TypeExpr::parse("const T &").unwrap(),
            TypeExpr::Ref {
                mutable: false,
                inner: Box::new(named("T"))
            }
        );
        assert_eq!(
            TypeExpr::parse("T const&").unwrap(),
            TypeExpr::parse("const T&").unwrap()
        );
    }

    #[test]
    fn rust_prefix_forms_match_cpp_forms() {
        assert_eq!(
            TypeExpr::parse("&mut T").unwrap(),
            TypeExpr::parse("T&").unwrap()
        );
        assert_eq!(
            TypeExpr::parse("*const u8").unwrap(),
            TypeExpr::parse("const u8*").unwrap()
        );
        assert_eq!(TypeExpr::parse("()").unwrap(), TypeExpr::Unit);
        assert_eq!(TypeExpr::parse("void").unwrap(), TypeExpr::Unit);
    }

    #[test]
    fn void_pointer() {
        assert_eq!(
            TypeExpr::parse("void*").unwrap(),
            TypeExpr::Ptr {
                mutable: true,
                inner: Box::new(TypeExpr::Unit)
            }
        );
    }

    #[test]
    fn pointer_to_const_pointer() {
        // `char* const*`: outer pointer's pointee is a const pointer to char.
        let ty = TypeExpr::parse("char* const*").unwrap();
        assert_eq!(
            ty,
            TypeExpr::Ptr {
                mutable: false,
                inner: Box::new(TypeExpr::Ptr {
                    mutable: true,
                    inner: Box::new(named("char"))
                })
            }
        );
    }

    #[test]
    fn multiword_c_primitive() {
        assert_eq!(
            TypeExpr::parse("unsigned long long").unwrap(),
            named("unsigned long long")
        );
    }

    #[test]
    fn generic_arguments_with_constants() {
        let ty = TypeExpr::parse("Vec<i32, 8>").unwrap();
        assert_eq!(
            ty,
            TypeExpr::Named {
                path: vec!["Vec".to_string()],
                args: vec![TypeArg::Type(named("i32")), TypeArg::Const("8".to_string())],
            }
        );
        assert_eq!(ty.to_string(), "Vec<i32, 8>");
    }

    #[test]
    fn nested_closing_angles() {
        let ty = TypeExpr::parse("std::vector<Option<T>>").unwrap();
        assert_eq!(ty.simple_names(), vec!["T"]);
        assert!(ty.mentions("T"));
    }

    #[test]
    fn simple_names_walks_through_qualifiers() {
        let ty = TypeExpr::parse("const Map<K, V>*").unwrap();
        assert_eq!(ty.simple_names(), vec!["K", "V"]);
        assert!(!ty.is_reference());
        assert!(!TypeExpr::parse("Option<&T>").unwrap().is_reference());
        assert!(TypeExpr::parse("const T&").unwrap().is_reference());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(TypeExpr::parse("").is_err());
        assert!(TypeExpr::parse("Vec<i32").is_err());
        assert!(TypeExpr::parse("*u8").is_err());
        assert!(TypeExpr::parse("T&&").is_err());
        assert!(TypeExpr::parse("T U").is_err());
        let err = TypeExpr::parse("a:b").unwrap_err();
        assert_eq!(err.token, "a:b");
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(TypeExpr::parse("&T").unwrap().to_string(), "const T&");
        assert_eq!(TypeExpr::parse("*mut ()").unwrap().to_string(), "void*");
    }

    #[test]
    fn type_param_shape() {
        assert!(looks_like_type_param("T"));
        assert!(looks_like_type_param("K2"));
        assert!(!looks_like_type_param("Tx"));
        assert!(!looks_like_type_param("t"));
        assert!(is_identifier("free_all"));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let nest = |n: usize| format!("{}T{}", "Option<".repeat(n), ">".repeat(n));
        assert!(TypeExpr::parse(&nest(20)).is_ok());

        let err = TypeExpr::parse(&nest(200)).unwrap_err();
        assert!(err.message.contains("nests deeper than"), "{err}");

        let err = TypeExpr::parse(&format!("T{}", "*".repeat(40))).unwrap_err();
        assert!(err.message.contains("nests deeper than"), "{err}");
        let err = TypeExpr::parse(&"*mut ".repeat(40)).unwrap_err();
        assert!(err.message.contains("nests deeper than"), "{err}");
    }
}
