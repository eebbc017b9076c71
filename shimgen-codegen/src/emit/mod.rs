//! Artifact emission
//!
//! Turns a checked [`InterfaceSpec`] into a [`GeneratedArtifact`]: an ordered
//! list of text fragments whose concatenation is the generated source file.
//! Each target language is a [`Backend`].
//!
//! Fragment order is part of the contract:
//!
//! ```text
//! Envelope → DataReference → ImplementerTrait → DispatchTable → Handle
//!          → Construction → Factory → EnvelopeClose → Advisory
//! ```
//!
//! Backends omit kinds they have no use for (the C++ target has no
//! `DataReference` or `ImplementerTrait`).

pub mod cpp;
pub mod rust;
pub mod writer;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::check::CheckDiagnostic;
use crate::error::EmissionError;
use crate::model::{GuardStyle, InterfaceSpec};

// ── Target & options ─────────────────────────────────────────────────────────

/// Output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Rust,
    Cpp,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Cpp => "cpp",
        }
    }

    /// Conventional file extension for artifacts of this target.
    pub fn extension(self) -> &'static str {
        match self {
            Target::Rust => "rs",
            Target::Cpp => "hpp",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(Target::Rust),
            "cpp" | "c++" | "cxx" => Ok(Target::Cpp),
            other => Err(format!("unknown target '{other}' (expected rust or cpp)")),
        }
    }
}

/// Indentation unit for targets rendered without a formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "IndentRepr")]
pub enum Indent {
    #[default]
    Tabs,
    Spaces(u8),
}

impl Indent {
    pub fn unit(self) -> String {
        match self {
            Indent::Tabs => "\t".to_string(),
            Indent::Spaces(n) => " ".repeat(usize::from(n)),
        }
    }
}

impl FromStr for Indent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("tabs") || s.eq_ignore_ascii_case("tab") {
            return Ok(Indent::Tabs);
        }
        match s.parse::<u8>() {
            Ok(n) if (1..=16).contains(&n) => Ok(Indent::Spaces(n)),
            _ => Err(format!(
                "invalid indent '{s}' (expected 'tabs' or a width between 1 and 16)"
            )),
        }
    }
}

/// Accepts `indent = "tabs"`, `indent = "4"` and `indent = 4`.
#[derive(Deserialize)]
#[serde(untagged)]
enum IndentRepr {
    Width(u8),
    Word(String),
}

impl TryFrom<IndentRepr> for Indent {
    type Error = String;

    fn try_from(value: IndentRepr) -> Result<Self, Self::Error> {
        match value {
            IndentRepr::Width(n) => n.to_string().parse(),
            IndentRepr::Word(w) => w.parse(),
        }
    }
}

/// Formatting knobs. None of these alter interface semantics.
///
/// Deserializable from the `[generate]` table of a `shimgen.toml`:
///
/// ```toml
/// [generate]
/// target = "cpp"
/// guard = "pragma"
/// indent = 4
/// header = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateOptions {
    pub target: Target,
    /// Overrides the interface's own guard style when set.
    #[serde(rename = "guard")]
    pub guard_style: Option<GuardStyle>,
    pub indent: Indent,
    /// Emit the `@generated` banner.
    pub header: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            target: Target::Rust,
            guard_style: None,
            indent: Indent::Tabs,
            header: true,
        }
    }
}

impl GenerateOptions {
    pub fn for_target(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// The guard style in effect for `spec`.
    pub fn guard_for<'s>(&'s self, spec: &'s InterfaceSpec) -> &'s GuardStyle {
        self.guard_style.as_ref().unwrap_or(&spec.guard_style)
    }
}

// ── Artifact ─────────────────────────────────────────────────────────────────

/// Role of one piece of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Banner, guard, imports, namespace opening.
    Envelope,
    /// Erased data reference type.
    DataReference,
    /// Trait concrete types implement.
    ImplementerTrait,
    /// Dispatch table type.
    DispatchTable,
    /// Handle type and its forwarding operations.
    Handle,
    /// Per-concrete-type table construction.
    Construction,
    Factory,
    /// Namespace closing, guard end.
    EnvelopeClose,
    /// Required-operations listing for implementers.
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    pub fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// The emitter's output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub interface: String,
    pub target: Target,
    pub fragments: Vec<Fragment>,
}

impl GeneratedArtifact {
    /// The final file text: non-empty fragments separated by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for frag in self.fragments.iter().filter(|f| !f.text.trim().is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&frag.text);
            if !frag.text.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }

    pub fn fragment(&self, kind: FragmentKind) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.kind == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = FragmentKind> + '_ {
        self.fragments.iter().map(|f| f.kind)
    }
}

// ── Backends ─────────────────────────────────────────────────────────────────

/// One output language.
pub trait Backend {
    fn target(&self) -> Target;

    /// Checks that only matter for this target (reserved words, renderable
    /// type tokens, ...). Run alongside [`crate::check::validate`].
    fn check(&self, spec: &InterfaceSpec) -> Vec<CheckDiagnostic>;

    /// Render the fragments of a checked interface.
    fn emit(
        &self,
        spec: &InterfaceSpec,
        options: &GenerateOptions,
    ) -> Result<Vec<Fragment>, EmissionError>;
}

/// The backend for `target`.
pub fn backend(target: Target) -> &'static dyn Backend {
    match target {
        Target::Rust => &rust::RustBackend,
        Target::Cpp => &cpp::CppBackend,
    }
}

/// Emit `spec` for `options.target`.
///
/// Only call this on an interface that passed [`crate::check::check`] and the
/// target's [`Backend::check`].
pub fn emit(
    spec: &InterfaceSpec,
    options: &GenerateOptions,
) -> Result<GeneratedArtifact, EmissionError> {
    let fragments = backend(options.target).emit(spec, options)?;
    Ok(GeneratedArtifact {
        interface: spec.name.clone(),
        target: options.target,
        fragments,
    })
}

// ── Name helpers ─────────────────────────────────────────────────────────────

/// Convert a PascalCase name to snake_case.
///
/// Runs of capitals stay together: `HTTPServer` → `http_server`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev != '_' && (prev.is_lowercase() || prev.is_ascii_digit() || next_lower) {
                result.push('_');
            }
        }
        for lc in c.to_lowercase() {
            result.push(lc);
        }
    }
    result
}

/// Convert a snake_case or kebab-case name to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => {
                    let upper: String = first.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
