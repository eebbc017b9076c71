//! Interface conformance checker
//!
//! Re-validates an [`InterfaceSpec`] independent of whichever front end built
//! it. Every violation is collected; nothing short-circuits.

use std::fmt;

use crate::model::InterfaceSpec;
use crate::types::{is_identifier, looks_like_type_param, TypeExpr};

/// A single conformance problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDiagnostic {
    pub severity: Severity,
    /// Location in the interface (e.g. `operations[1].params[0]`).
    pub location: String,
    /// Human-readable description of the problem.
    pub message: String,
    pub expected: Option<String>,
    pub found: Option<String>,
}

/// Severity of a [`CheckDiagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocks emission.
    Error,
    /// Advisory; emission proceeds.
    Warning,
}

impl CheckDiagnostic {
    pub fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: location.into(),
            message: message.into(),
            expected: None,
            found: None,
        }
    }

    pub fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(location, message)
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for CheckDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        write!(f, "[{}] {}: {}", tag, self.location, self.message)?;
        match (&self.expected, &self.found) {
            (Some(e), Some(g)) => write!(f, " (expected {e}, found {g})"),
            (Some(e), None) => write!(f, " (expected {e})"),
            (None, Some(g)) => write!(f, " (found {g})"),
            (None, None) => Ok(()),
        }
    }
}

/// Parameter names reserved for the injected data reference.
pub const RESERVED_PARAM_NAMES: &[&str] = &["data", "impl", "self"];

/// Check an interface and return every problem found.
///
/// An empty `Vec` means the interface is valid. Any entry with
/// [`Severity::Error`] blocks emission.
pub fn validate(spec: &InterfaceSpec) -> Vec<CheckDiagnostic> {
    let mut diags: Vec<CheckDiagnostic> = Vec::new();

    check_name(spec, &mut diags);
    check_generics(spec, &mut diags);
    check_operations(spec, &mut diags);

    tracing::debug!(
        "Checked interface '{}': {} errors, {} warnings",
        spec.name,
        diags.iter().filter(|d| d.is_error()).count(),
        diags.iter().filter(|d| !d.is_error()).count()
    );
    diags
}

/// Returns `true` if `validate()` produces no `Error`-severity issues.
pub fn is_valid(spec: &InterfaceSpec) -> bool {
    !validate(spec).iter().any(CheckDiagnostic::is_error)
}

/// `Ok(warnings)` when the interface may be emitted, otherwise `Err` with
/// every diagnostic (errors and warnings) found.
pub fn check(spec: &InterfaceSpec) -> Result<Vec<CheckDiagnostic>, Vec<CheckDiagnostic>> {
    let diags = validate(spec);
    if diags.iter().any(CheckDiagnostic::is_error) {
        Err(diags)
    } else {
        Ok(diags)
    }
}

// ── Internal checks ──────────────────────────────────────────────────────────

fn check_name(spec: &InterfaceSpec, diags: &mut Vec<CheckDiagnostic>) {
    if spec.name.is_empty() {
        diags.push(CheckDiagnostic::error("name", "interface name must not be empty"));
        return;
    }
    if !is_identifier(&spec.name) {
        diags.push(
            CheckDiagnostic::error("name", "interface name is not a valid identifier")
                .expected("[A-Za-z_][A-Za-z0-9_]*")
                .found(&spec.name),
        );
        return;
    }
    let pascal = spec.name.starts_with(|c: char| c.is_ascii_uppercase())
        && !spec.name.contains('_');
    if !pascal {
        diags.push(CheckDiagnostic::warning(
            "name",
            format!("interface name '{}' should be PascalCase", spec.name),
        ));
    }
}

fn check_generics(spec: &InterfaceSpec, diags: &mut Vec<CheckDiagnostic>) {
    let mut seen: Vec<&str> = Vec::new();

    for (idx, g) in spec.generic_params.iter().enumerate() {
        let loc = format!("generic_params[{idx}]");

        if !is_identifier(&g.name) {
            diags.push(
                CheckDiagnostic::error(&loc, "generic parameter name is not a valid identifier")
                    .found(format!("'{}'", g.name)),
            );
            continue;
        }
        if seen.contains(&g.name.as_str()) {
            diags.push(CheckDiagnostic::error(
                &loc,
                format!("duplicate generic parameter '{}'", g.name),
            ));
            continue;
        }
        seen.push(&g.name);

        if matches!(g.kind.as_deref(), Some(k) if k.trim().is_empty()) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.kind"),
                format!("generic parameter '{}' has an empty kind", g.name),
            ));
        }

        let used = spec.operations.iter().any(|op| {
            op.return_type.mentions(&g.name) || op.params.iter().any(|p| p.ty.mentions(&g.name))
        });
        if !used {
            diags.push(CheckDiagnostic::warning(
                &loc,
                format!("generic parameter '{}' is never referenced", g.name),
            ));
        }
    }
}

fn check_operations(spec: &InterfaceSpec, diags: &mut Vec<CheckDiagnostic>) {
    if spec.operations.is_empty() {
        diags.push(CheckDiagnostic::warning(
            "operations",
            format!("interface '{}' declares no operations", spec.name),
        ));
        return;
    }

    let mut seen: Vec<&str> = Vec::new();

    for (idx, op) in spec.operations.iter().enumerate() {
        let loc = format!("operations[{idx}]");

        if op.name.is_empty() {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                "operation name must not be empty",
            ));
        } else if !is_identifier(&op.name) {
            diags.push(
                CheckDiagnostic::error(
                    format!("{loc}.name"),
                    "operation name is not a valid identifier",
                )
                .found(format!("'{}'", op.name)),
            );
        } else if seen.contains(&op.name.as_str()) {
            diags.push(CheckDiagnostic::error(
                format!("{loc}.name"),
                format!("duplicate operation name '{}'", op.name),
            ));
        } else {
            seen.push(&op.name);
        }

        let mut param_names: Vec<&str> = Vec::new();
        for (pidx, p) in op.params.iter().enumerate() {
            let ploc = format!("{loc}.params[{pidx}]");

            if !is_identifier(&p.name) {
                diags.push(
                    CheckDiagnostic::error(&ploc, "parameter name is not a valid identifier")
                        .found(format!("'{}'", p.name)),
                );
            } else if RESERVED_PARAM_NAMES.contains(&p.name.as_str()) {
                diags.push(
                    CheckDiagnostic::error(
                        &ploc,
                        format!(
                            "parameter '{}' collides with the injected data reference",
                            p.name
                        ),
                    )
                    .expected(format!("a name other than {}", RESERVED_PARAM_NAMES.join(", "))),
                );
            } else if param_names.contains(&p.name.as_str()) {
                diags.push(CheckDiagnostic::error(
                    &ploc,
                    format!("duplicate parameter name '{}' in '{}'", p.name, op.name),
                ));
            } else {
                param_names.push(&p.name);
            }

            if p.ty.is_unit() {
                diags.push(
                    CheckDiagnostic::error(
                        format!("{ploc}.type"),
                        format!("parameter '{}' has unit type", p.name),
                    )
                    .found("void"),
                );
            }

            unknown_generics(
                spec,
                &p.ty,
                &format!("{ploc}.type"),
                &format!("parameter '{}'", p.name),
                diags,
            );
        }

        unknown_generics(
            spec,
            &op.return_type,
            &format!("{loc}.return_type"),
            "return type",
            diags,
        );

        if op.is_optional() && op.return_type.is_reference() {
            diags.push(
                CheckDiagnostic::error(
                    format!("{loc}.return_type"),
                    format!(
                        "optional operation '{}' returns a reference and has no inert default",
                        op.name
                    ),
                )
                .found(op.return_type.to_string()),
            );
        }
    }
}

fn unknown_generics(
    spec: &InterfaceSpec,
    ty: &TypeExpr,
    location: &str,
    site: &str,
    diags: &mut Vec<CheckDiagnostic>,
) {
    let mut reported: Vec<&str> = Vec::new();
    for name in ty.simple_names() {
        if looks_like_type_param(name) && !spec.declares_generic(name) && !reported.contains(&name)
        {
            reported.push(name);
            diags.push(CheckDiagnostic::error(
                location,
                format!("unknown generic parameter '{name}' referenced in {site}"),
            ));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
