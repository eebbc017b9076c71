//! Specification model
//!
//! The normalized in-memory form of one interface definition. Built by a
//! front end in [`crate::parse`] or programmatically with the builder
//! methods below, then handed to [`crate::check`] and [`crate::emit`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::TypeExpr;

// ── Interface ────────────────────────────────────────────────────────────────

/// One interface definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// PascalCase interface name, e.g. `List`.
    pub name: String,
    /// Generic parameters in declaration order.
    pub generic_params: Vec<GenericParam>,
    /// Operations in declaration order. This is the dispatch-table layout.
    pub operations: Vec<OperationSpec>,
    pub binding_mode: BindingMode,
    pub guard_style: GuardStyle,
    /// Extra imports for the artifact envelope.
    pub imports: Vec<String>,
    /// Namespace path the emitted items are wrapped in.
    pub namespace: Vec<String>,
}

impl InterfaceSpec {
    /// An empty bound interface with no guard.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_params: Vec::new(),
            operations: Vec::new(),
            binding_mode: BindingMode::Bound,
            guard_style: GuardStyle::None,
            imports: Vec::new(),
            namespace: Vec::new(),
        }
    }

    pub fn with_generic(mut self, param: GenericParam) -> Self {
        self.generic_params.push(param);
        self
    }

    pub fn with_operation(mut self, op: OperationSpec) -> Self {
        self.operations.push(op);
        self
    }

    pub fn with_binding(mut self, mode: BindingMode) -> Self {
        self.binding_mode = mode;
        self
    }

    pub fn with_guard(mut self, guard: GuardStyle) -> Self {
        self.guard_style = guard;
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Whether `name` is a declared generic parameter.
    pub fn declares_generic(&self, name: &str) -> bool {
        self.generic_params.iter().any(|g| g.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }
}

// ── Generic parameter ────────────────────────────────────────────────────────

/// A generic parameter such as `T` or `T: typename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    /// Free-text kind. `None` means a plain type parameter.
    pub kind: Option<String>,
}

impl GenericParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// `true` when the kind is absent or one of the plain type-parameter
    /// spellings (`typename`, `class`).
    pub fn is_plain_type(&self) -> bool {
        matches!(self.kind.as_deref(), None | Some("typename") | Some("class"))
    }
}

// ── Operation ────────────────────────────────────────────────────────────────

/// One callable member of the interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub params: Vec<Param>,
    /// [`TypeExpr::Unit`] for operations returning nothing.
    pub return_type: TypeExpr,
    pub mutability: Mutability,
    pub optionality: Optionality,
}

impl OperationSpec {
    /// A required, mutating operation with no parameters returning unit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeExpr::Unit,
            mutability: Mutability::Mutating,
            optionality: Optionality::Required,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn returning(mut self, ty: TypeExpr) -> Self {
        self.return_type = ty;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.mutability = Mutability::ReadOnly;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optionality = Optionality::Optional;
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.mutability == Mutability::ReadOnly
    }

    pub fn is_optional(&self) -> bool {
        self.optionality == Optionality::Optional
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A `(name, type)` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Callable through a read-only reference to the concrete value.
    ReadOnly,
    Mutating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Optionality {
    Required,
    /// May be missing from a concrete type; resolved to an inert default.
    Optional,
}

// ── Binding mode ─────────────────────────────────────────────────────────────

/// Whether the handle stores the data reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Handle = data reference + table reference.
    #[default]
    Bound,
    /// Handle = table reference; every call receives the data reference.
    Unbound,
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingMode::Bound => write!(f, "bound"),
            BindingMode::Unbound => write!(f, "unbound"),
        }
    }
}

// ── Guard style ──────────────────────────────────────────────────────────────

/// File-guard convention for the artifact envelope.
///
/// String forms: `"pragma"`, `"none"`, `"macro"` (name derived from the
/// interface) and `"macro:NAME"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GuardStyle {
    PragmaOnce,
    /// `#ifndef NAME` / `#define NAME` / `#endif`. An empty name is derived
    /// from the interface name at emission time.
    MacroGuard(String),
    #[default]
    None,
}

impl GuardStyle {
    /// Resolve the macro name for `interface`, deriving one when unset.
    pub fn macro_name(&self, interface: &str) -> Option<String> {
        match self {
            GuardStyle::MacroGuard(name) if !name.is_empty() => Some(name.clone()),
            GuardStyle::MacroGuard(_) => Some(format!(
                "{}_INTERFACE_HPP_",
                crate::emit::to_snake_case(interface).to_uppercase()
            )),
            _ => None,
        }
    }
}

impl FromStr for GuardStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pragma" | "pragma-once" => Ok(GuardStyle::PragmaOnce),
            "none" => Ok(GuardStyle::None),
            "macro" | "ifdef" => Ok(GuardStyle::MacroGuard(String::new())),
            other => match other.strip_prefix("macro:") {
                Some(name) if crate::types::is_identifier(name.trim()) => {
                    Ok(GuardStyle::MacroGuard(name.trim().to_string()))
                }
                Some(name) => Err(format!("invalid guard macro name '{name}'")),
                None => Err(format!(
                    "unknown guard style '{other}' (expected pragma, none, macro or macro:NAME)"
                )),
            },
        }
    }
}

impl TryFrom<String> for GuardStyle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GuardStyle> for String {
    fn from(value: GuardStyle) -> Self {
        value.to_string()
    }
}

impl fmt::Display for GuardStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardStyle::PragmaOnce => write!(f, "pragma"),
            GuardStyle::MacroGuard(name) if name.is_empty() => write!(f, "macro"),
            GuardStyle::MacroGuard(name) => write!(f, "macro:{name}"),
            GuardStyle::None => write!(f, "none"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
