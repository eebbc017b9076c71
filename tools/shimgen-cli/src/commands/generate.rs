//! `shimgen generate` subcommand
//!
//! # Usage
//!
//! ```text
//! shimgen generate specs/list.toml                  # writes specs/list.rs
//! shimgen generate specs/alloc.shim --target cpp    # writes specs/alloc.hpp
//! shimgen generate list.toml --out src/list_shim.rs
//! shimgen generate list.toml --check                # fail if the output is stale (CI)
//! shimgen generate list.toml --dry-run              # print to stdout, don't write
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use shimgen_codegen::{
    advisory, generate_with_report, Diagnostic, GenerateOptions, GuardStyle, Indent, Source,
    SourceFormat, Target,
};

use crate::config::ShimgenConfig;
use crate::error::{CliError, CliResult};
use crate::output::{print_advisory_diff, print_diagnostics};

/// Generate a shim from an interface definition
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Interface definition (.toml, otherwise IDL)
    pub spec: PathBuf,

    /// Output path (default: the definition's path with the target's extension)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Output language: rust or cpp
    #[arg(long)]
    pub target: Option<String>,

    /// Guard style override: pragma, none, macro or macro:NAME
    #[arg(long)]
    pub guard: Option<String>,

    /// Indentation for the C++ target: tabs or a width
    #[arg(long)]
    pub indent: Option<String>,

    /// Omit the @generated banner
    #[arg(long)]
    pub no_header: bool,

    /// Configuration file (default: ./shimgen.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not write; exit 1 if the output file would change
    #[arg(long)]
    pub check: bool,

    /// Print generated output to stdout instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateCommand {
    pub fn execute(self) -> CliResult<()> {
        let config = ShimgenConfig::load(self.config.as_deref())?;
        let options = self.options(config.generate)?;

        // ── Read definition ───────────────────────────────────────────────
        if !self.spec.exists() {
            return Err(CliError::spec_not_found(&self.spec));
        }
        let text = std::fs::read_to_string(&self.spec)
            .with_context(|| format!("reading {}", self.spec.display()))?;
        let format = SourceFormat::from_path(&self.spec);

        // ── Generate ──────────────────────────────────────────────────────
        let report = match generate_with_report(Source::text(&text, format), &options) {
            Ok(report) => report,
            Err(Diagnostic::Check(diags)) => {
                print_diagnostics(&diags, &self.spec);
                return Err(anyhow::anyhow!("checks failed; fix the errors above and retry").into());
            }
            Err(e) => return Err(CliError::generation(&self.spec, e)),
        };
        print_diagnostics(&report.warnings, &self.spec);
        let rendered = report.artifact.render();

        if self.dry_run {
            println!("{}  {}", "── Output".dimmed(), self.out_path(options.target).display());
            println!("{rendered}");
            return Ok(());
        }

        // ── Write ─────────────────────────────────────────────────────────
        let out = self.out_path(options.target);
        let previous = std::fs::read_to_string(&out).ok();
        if let Some(prev) = &previous {
            let diff = advisory::diff(&advisory::extract(prev), &advisory::extract(&rendered));
            if !diff.is_empty() {
                println!("  {} operations changed in {}:", "~".yellow(), out.display());
                print_advisory_diff(&diff);
            }
        }

        if self.check {
            if previous.as_deref() != Some(rendered.as_str()) {
                return Err(CliError::Stale { path: out });
            }
            println!("{} {} is up to date", "✓".green(), out.display());
            return Ok(());
        }

        write_if_changed(&out, &rendered)?;
        println!(
            "{} {} ({} operation(s), {})",
            "✓".green(),
            report.artifact.interface,
            advisory::extract(&rendered).len(),
            options.target
        );
        Ok(())
    }

    /// Config file values, then flags on top.
    fn options(&self, mut options: GenerateOptions) -> CliResult<GenerateOptions> {
        if let Some(t) = &self.target {
            options.target = t
                .parse::<Target>()
                .map_err(|e| CliError::invalid_option("target", e))?;
        }
        if let Some(g) = &self.guard {
            options.guard_style = Some(
                g.parse::<GuardStyle>()
                    .map_err(|e| CliError::invalid_option("guard", e))?,
            );
        }
        if let Some(i) = &self.indent {
            options.indent = i
                .parse::<Indent>()
                .map_err(|e| CliError::invalid_option("indent", e))?;
        }
        if self.no_header {
            options.header = false;
        }
        Ok(options)
    }

    fn out_path(&self, target: Target) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| self.spec.with_extension(target.extension()))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Write `contents` to `path`, creating parent directories as needed.
/// Returns `true` when the file was (re)written.
fn write_if_changed(path: &Path, contents: &str) -> CliResult<bool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory: {}", parent.display()))?;
    }

    let existing = std::fs::read_to_string(path).ok();
    let changed = existing.as_deref() != Some(contents);

    if changed {
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
        println!("  {} {} written", "→".cyan(), path.display());
    } else {
        println!("  {} {} unchanged", "·".dimmed(), path.display());
    }
    Ok(changed)
}
