//! Error types shared across the generation pipeline.

use thiserror::Error;

use crate::check::CheckDiagnostic;

/// A fatal front-end error. Parsing stops at the first malformed construct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message} (at '{fragment}')", location_prefix(.line, .column))]
pub struct ParseDiagnostic {
    /// The offending piece of source text, trimmed to one line.
    pub fragment: String,
    pub message: String,
    /// 1-based line, when the front end knows it.
    pub line: Option<usize>,
    /// 1-based column, when the front end knows it.
    pub column: Option<usize>,
}

impl ParseDiagnostic {
    pub fn new(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        let fragment: String = fragment.into();
        Self {
            fragment: first_line(&fragment),
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

fn location_prefix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!("{l}:{c}: "),
        (Some(l), None) => format!("{l}: "),
        _ => String::new(),
    }
}

fn first_line(s: &str) -> String {
    let line = s.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 60 {
        let cut: String = line.chars().take(57).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

/// Internal invariant violated while rendering an artifact.
///
/// Emission is only attempted on checked specs, so this signals a generator
/// bug or a type token the target cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    #[error("type '{token}' cannot be rendered for the {target} target: {reason}")]
    UnrenderableType {
        token: String,
        target: &'static str,
        reason: String,
    },

    #[error("'{name}' cannot be used as a {target} identifier")]
    InvalidIdentifier { name: String, target: &'static str },

    #[error("generated {what} failed to re-parse: {reason}")]
    Reparse { what: String, reason: String },
}

/// Error returned by [`crate::generate`]: the first failing stage.
#[derive(Debug, Clone, Error)]
pub enum Diagnostic {
    #[error("parse error: {0}")]
    Parse(#[from] ParseDiagnostic),

    #[error("interface failed checks:\n{}", render_list(.0))]
    Check(Vec<CheckDiagnostic>),

    #[error("emission failed: {0}")]
    Emit(#[from] EmissionError),
}

impl Diagnostic {
    /// Checker diagnostics, if this is a check failure.
    pub fn check_diagnostics(&self) -> &[CheckDiagnostic] {
        match self {
            Diagnostic::Check(list) => list,
            _ => &[],
        }
    }
}

fn render_list(list: &[CheckDiagnostic]) -> String {
    list.iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_diagnostic_display_includes_position() {
        let d = ParseDiagnostic::new("fn get( -> i32;", "expected ')'").at(3, 12);
        assert_eq!(d.to_string(), "3:12: expected ')' (at 'fn get( -> i32;')");

        let d = ParseDiagnostic::new("", "empty interface name");
        assert_eq!(d.to_string(), "empty interface name (at '')");
    }

    #[test]
    fn long_fragments_are_clipped_to_one_line() {
        let src = format!("{}\nsecond line", "x".repeat(100));
        let d = ParseDiagnostic::new(src, "boom");
        assert!(d.fragment.ends_with("..."));
        assert!(!d.fragment.contains('\n'));
    }
}
