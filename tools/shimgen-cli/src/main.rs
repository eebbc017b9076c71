//! shimgen CLI - generate type-erasure interface shims
//!
//! Reads an interface definition (TOML or IDL), checks it and writes the
//! generated Rust or C++ source.

use clap::{Parser, Subcommand};
use commands::{advisory::AdvisoryCommand, check::CheckCommand, generate::GenerateCommand};

mod commands;
mod config;
mod error;
mod output;

/// shimgen - generate type-erasure interface shims
#[derive(Debug, Parser)]
#[command(name = "shimgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a shim from an interface definition
    #[command(name = "generate")]
    Generate(GenerateCommand),

    /// Parse and check an interface definition without generating
    #[command(name = "check")]
    Check(CheckCommand),

    /// Print the implementer checklist of a generated file
    #[command(name = "advisory")]
    Advisory(AdvisoryCommand),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Generate(cmd) => cmd.execute(),
        Command::Check(cmd) => cmd.execute(),
        Command::Advisory(cmd) => cmd.execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
