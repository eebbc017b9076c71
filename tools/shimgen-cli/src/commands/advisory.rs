//! `shimgen advisory` subcommand

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use shimgen_codegen::advisory;

use crate::error::{CliError, CliResult};

/// Print the implementer checklist of a generated file
#[derive(Debug, Args)]
pub struct AdvisoryCommand {
    /// A file previously written by `shimgen generate`
    pub artifact: PathBuf,
}

impl AdvisoryCommand {
    pub fn execute(self) -> CliResult<()> {
        let text = std::fs::read_to_string(&self.artifact)
            .with_context(|| format!("reading {}", self.artifact.display()))?;

        let entries = advisory::extract(&text);
        if entries.is_empty() {
            return Err(CliError::NoAdvisory {
                path: self.artifact,
            });
        }

        println!("{}  {}", "── Required operations".dimmed(), self.artifact.display());
        for e in &entries {
            let tag = if e.optional {
                "optional".dimmed()
            } else {
                "required".normal()
            };
            println!("  {:<10} {}", tag, e.signature);
        }
        Ok(())
    }
}
