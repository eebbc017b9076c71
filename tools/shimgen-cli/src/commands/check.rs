//! `shimgen check` subcommand

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use shimgen_codegen::{check_for_target, parse, GenerateOptions, SourceFormat, Target};

use crate::error::{CliError, CliResult};
use crate::output::print_diagnostics;

/// Parse and check an interface definition without generating
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Interface definition (.toml, otherwise IDL)
    pub spec: PathBuf,

    /// Also run the checks of this target: rust or cpp
    #[arg(long, default_value = "rust")]
    pub target: String,
}

impl CheckCommand {
    pub fn execute(self) -> CliResult<()> {
        let target = self
            .target
            .parse::<Target>()
            .map_err(|e| CliError::invalid_option("target", e))?;

        if !self.spec.exists() {
            return Err(CliError::spec_not_found(&self.spec));
        }
        let text = std::fs::read_to_string(&self.spec)
            .with_context(|| format!("reading {}", self.spec.display()))?;

        let spec = parse::parse(&text, SourceFormat::from_path(&self.spec))
            .map_err(|e| CliError::generation(&self.spec, e.into()))?;

        match check_for_target(&spec, &GenerateOptions::for_target(target)) {
            Ok(warnings) => {
                print_diagnostics(&warnings, &self.spec);
                println!(
                    "{} {} ({} operation(s)) passed {} checks",
                    "✓".green(),
                    spec.name,
                    spec.operations.len(),
                    target
                );
                Ok(())
            }
            Err(diags) => {
                print_diagnostics(&diags, &self.spec);
                Err(anyhow::anyhow!("checks failed; fix the errors above and retry").into())
            }
        }
    }
}
