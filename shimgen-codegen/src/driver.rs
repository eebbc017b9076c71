//! Generation pipeline: parse → check → emit.
//!
//! Each stage runs only when the previous one succeeded and nothing partial
//! is ever returned. Checker and target-check diagnostics are gathered into a
//! single report.

use crate::check::{self, CheckDiagnostic};
use crate::emit::{self, GenerateOptions, GeneratedArtifact};
use crate::error::Diagnostic;
use crate::model::InterfaceSpec;
use crate::parse::{self, SourceFormat};

/// Where an interface comes from.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    Toml(&'a str),
    Idl(&'a str),
    Spec(InterfaceSpec),
}

impl<'a> Source<'a> {
    /// Text in the given format.
    pub fn text(text: &'a str, format: SourceFormat) -> Self {
        match format {
            SourceFormat::Toml => Source::Toml(text),
            SourceFormat::Idl => Source::Idl(text),
        }
    }

    fn into_spec(self) -> Result<InterfaceSpec, Diagnostic> {
        let spec = match self {
            Source::Toml(text) => parse::parse(text, SourceFormat::Toml)?,
            Source::Idl(text) => parse::parse(text, SourceFormat::Idl)?,
            Source::Spec(spec) => spec,
        };
        Ok(spec)
    }
}

impl From<InterfaceSpec> for Source<'_> {
    fn from(spec: InterfaceSpec) -> Self {
        Source::Spec(spec)
    }
}

/// A successful run: the artifact and every warning raised on the way.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub artifact: GeneratedArtifact,
    pub warnings: Vec<CheckDiagnostic>,
}

/// Run the checker and the target's own checks. `Ok` carries warnings only.
pub fn check_for_target(
    spec: &InterfaceSpec,
    options: &GenerateOptions,
) -> Result<Vec<CheckDiagnostic>, Vec<CheckDiagnostic>> {
    let mut diags = check::validate(spec);
    diags.extend(emit::backend(options.target).check(spec));

    if diags.iter().any(CheckDiagnostic::is_error) {
        Err(diags)
    } else {
        Ok(diags)
    }
}

/// Parse, check and emit `source`.
pub fn generate(source: Source<'_>, options: &GenerateOptions) -> Result<GeneratedArtifact, Diagnostic> {
    generate_with_report(source, options).map(|report| report.artifact)
}

/// [`generate`], also returning the warnings.
pub fn generate_with_report(
    source: Source<'_>,
    options: &GenerateOptions,
) -> Result<GenerationReport, Diagnostic> {
    let spec = source.into_spec()?;
    tracing::debug!(
        "Parsed interface '{}' ({} operations)",
        spec.name,
        spec.operations.len()
    );

    let warnings = check_for_target(&spec, options).map_err(|diags| {
        tracing::debug!(
            "Interface '{}' failed checks with {} diagnostics",
            spec.name,
            diags.len()
        );
        Diagnostic::Check(diags)
    })?;
    for w in &warnings {
        tracing::warn!("{}", w);
    }

    let artifact = emit::emit(&spec, options)?;
    tracing::debug!(
        "Emitted {} fragments for '{}' ({} target)",
        artifact.fragments.len(),
        spec.name,
        options.target
    );

    Ok(GenerationReport { artifact, warnings })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
