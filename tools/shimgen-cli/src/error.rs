//! CLI Error Types

use std::path::{Path, PathBuf};

use shimgen_codegen::Diagnostic;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Interface definition file does not exist
    #[error("Interface definition not found: {}\n  Hint: pass a .toml or .shim file", .path.display())]
    SpecNotFound { path: PathBuf },

    /// A flag value could not be parsed
    #[error("Invalid value for --{flag}: {reason}")]
    InvalidOption { flag: &'static str, reason: String },

    /// The interface did not make it through the pipeline
    #[error("{}: {source}", .path.display())]
    Generation {
        path: PathBuf,
        #[source]
        source: Diagnostic,
    },

    /// `--check` found an output that would change
    #[error("{} is out of date\n  Hint: run 'shimgen generate' without --check to refresh it", .path.display())]
    Stale { path: PathBuf },

    /// The file has no advisory block
    #[error("No IMPLEMENTATION block found in {}", .path.display())]
    NoAdvisory { path: PathBuf },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn spec_not_found(path: &Path) -> Self {
        Self::SpecNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn invalid_option(flag: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            flag,
            reason: reason.into(),
        }
    }

    pub fn generation(path: &Path, source: Diagnostic) -> Self {
        Self::Generation {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_hints() {
        let e = CliError::spec_not_found(Path::new("specs/list.toml"));
        assert!(e.to_string().contains("specs/list.toml"));
        assert!(e.to_string().contains("Hint"));

        let e = CliError::invalid_option("indent", "expected tabs or a width");
        assert_eq!(e.to_string(), "Invalid value for --indent: expected tabs or a width");
    }
}
