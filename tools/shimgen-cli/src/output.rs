//! Terminal output helpers

use std::path::Path;

use colored::Colorize;
use shimgen_codegen::{AdvisoryDiff, CheckDiagnostic, Severity};

/// Print diagnostics to stderr and return `true` if any is an error.
pub fn print_diagnostics(diags: &[CheckDiagnostic], source: &Path) -> bool {
    let mut has_errors = false;
    for d in diags {
        let detail = match (&d.expected, &d.found) {
            (Some(e), Some(f)) => format!(" (expected {e}, found {f})"),
            (Some(e), None) => format!(" (expected {e})"),
            (None, Some(f)) => format!(" (found {f})"),
            (None, None) => String::new(),
        };
        match d.severity {
            Severity::Error => {
                eprintln!("{} [{}] {}{}", "✗".red(), d.location, d.message, detail);
                has_errors = true;
            }
            Severity::Warning => {
                eprintln!("{} [{}] {}{}", "!".yellow(), d.location, d.message, detail);
            }
        }
    }
    if !diags.is_empty() {
        eprintln!("  in: {}", source.display());
    }
    has_errors
}

/// Summarize how the implementer checklist changed.
pub fn print_advisory_diff(diff: &AdvisoryDiff) {
    for e in &diff.added {
        println!("    {} {}", "+".green(), e);
    }
    for e in &diff.removed {
        println!("    {} {}", "-".red(), e);
    }
    for (old, new) in &diff.changed {
        println!("    {} {} {} {}", "~".yellow(), old, "→".dimmed(), new);
    }
}
