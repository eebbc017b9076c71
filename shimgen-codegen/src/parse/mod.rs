//! Specification front ends
//!
//! Two grammars produce the same [`InterfaceSpec`]:
//!
//! - [`toml`]: a declarative table form, deserialized with `serde`.
//! - [`idl`]: a compact interface syntax parsed with `nom`.
//!
//! Both are single-pass and all-or-nothing: the first malformed construct
//! aborts with a [`ParseDiagnostic`] naming the offending fragment.

pub mod idl;
pub mod toml;

use std::path::Path;

use crate::error::ParseDiagnostic;
use crate::model::{GenericParam, InterfaceSpec, Param};
use crate::types::{is_identifier, looks_like_type_param, TypeExpr};

/// Which front end to run on a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Idl,
}

impl SourceFormat {
    /// `.toml` selects the table form, anything else the IDL.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SourceFormat::Toml,
            _ => SourceFormat::Idl,
        }
    }
}

/// Parse `text` with the front end for `format`.
pub fn parse(text: &str, format: SourceFormat) -> Result<InterfaceSpec, ParseDiagnostic> {
    match format {
        SourceFormat::Toml => toml::parse(text),
        SourceFormat::Idl => idl::parse(text),
    }
}

// ── Shared declaration helpers ───────────────────────────────────────────────

/// Split `name: type` at the first single colon (`::` belongs to the type).
pub(crate) fn split_decl(decl: &str) -> Option<(&str, &str)> {
    let bytes = decl.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        let prev_colon = i > 0 && bytes[i - 1] == b':';
        let next_colon = bytes.get(i + 1) == Some(&b':');
        if !prev_colon && !next_colon {
            return Some((decl[..i].trim(), decl[i + 1..].trim()));
        }
    }
    None
}

/// `idx: int` → [`Param`].
pub(crate) fn parse_param(decl: &str) -> Result<Param, ParseDiagnostic> {
    let (name, ty) = split_decl(decl).ok_or_else(|| {
        ParseDiagnostic::new(decl, "malformed parameter declaration, expected 'name: type'")
    })?;
    if !is_identifier(name) {
        return Err(ParseDiagnostic::new(
            decl,
            format!("parameter name '{name}' is not a valid identifier"),
        ));
    }
    Ok(Param {
        name: name.to_string(),
        ty: parse_type(ty)?,
    })
}

/// `T` or `T: kind` → [`GenericParam`].
pub(crate) fn parse_generic(decl: &str) -> Result<GenericParam, ParseDiagnostic> {
    let (name, kind) = match split_decl(decl) {
        Some((name, kind)) => (name, Some(kind)),
        None => (decl.trim(), None),
    };
    if !is_identifier(name) {
        return Err(ParseDiagnostic::new(
            decl,
            format!("generic parameter name '{name}' is not a valid identifier"),
        ));
    }
    let mut param = GenericParam::new(name);
    if let Some(kind) = kind {
        if kind.is_empty() {
            return Err(ParseDiagnostic::new(
                decl,
                format!("generic parameter '{name}' has an empty kind"),
            ));
        }
        param = param.with_kind(kind);
    }
    Ok(param)
}

pub(crate) fn parse_type(token: &str) -> Result<TypeExpr, ParseDiagnostic> {
    TypeExpr::parse(token).map_err(|e| ParseDiagnostic::new(token, e.to_string()))
}

/// Structural checks every front end enforces before handing the spec on:
/// unique operation names and declared generic references.
///
/// `positions[i]` is the `(line, column)` of operation `i`, when known.
pub(crate) fn finish(
    spec: InterfaceSpec,
    positions: &[(usize, usize)],
) -> Result<InterfaceSpec, ParseDiagnostic> {
    let at = |diag: ParseDiagnostic, idx: usize| match positions.get(idx) {
        Some(&(line, col)) => diag.at(line, col),
        None => diag,
    };

    for (idx, op) in spec.operations.iter().enumerate() {
        if spec.operations[..idx].iter().any(|o| o.name == op.name) {
            return Err(at(
                ParseDiagnostic::new(&op.name, format!("duplicate operation name '{}'", op.name)),
                idx,
            ));
        }

        let sites = op
            .params
            .iter()
            .map(|p| (&p.ty, format!("parameter '{}'", p.name)))
            .chain(std::iter::once((&op.return_type, "return type".to_string())));
        for (ty, site) in sites {
            if let Some(name) = ty
                .simple_names()
                .into_iter()
                .find(|n| looks_like_type_param(n) && !spec.declares_generic(n))
            {
                return Err(at(
                    ParseDiagnostic::new(
                        ty.to_string(),
                        format!("unknown generic parameter '{name}' referenced in {site}"),
                    ),
                    idx,
                ));
            }
        }
    }

    Ok(spec)
}

/// 1-based `(line, column)` of byte `offset` in `src`.
pub(crate) fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
