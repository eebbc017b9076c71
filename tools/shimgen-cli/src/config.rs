//! `shimgen.toml` loading
//!
//! ```toml
//! [generate]
//! target = "cpp"
//! guard = "pragma"
//! indent = 4
//! header = true
//! ```
//!
//! Command-line flags override file values.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use shimgen_codegen::GenerateOptions;

use crate::error::CliResult;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "shimgen.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShimgenConfig {
    #[serde(default)]
    pub generate: GenerateOptions,
}

impl ShimgenConfig {
    pub fn from_toml(src: &str) -> CliResult<Self> {
        Ok(toml::from_str(src)?)
    }

    /// Load `explicit` if given (it must exist), else `shimgen.toml` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        let path: PathBuf = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let src = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        tracing::info!("Using configuration from {}", path.display());
        Self::from_toml(&src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shimgen_codegen::{GuardStyle, Indent, Target};

    #[test]
    fn generate_table() {
        let cfg = ShimgenConfig::from_toml(
            r#"
[generate]
target = "cpp"
guard = "pragma"
indent = "2"
header = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.generate.target, Target::Cpp);
        assert_eq!(cfg.generate.guard_style, Some(GuardStyle::PragmaOnce));
        assert_eq!(cfg.generate.indent, Indent::Spaces(2));
        assert!(!cfg.generate.header);
    }

    #[test]
    fn empty_file_is_defaults() {
        let cfg = ShimgenConfig::from_toml("").unwrap();
        assert_eq!(cfg.generate, GenerateOptions::default());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(ShimgenConfig::from_toml("[emit]\ntarget = \"rust\"\n").is_err());
    }

    #[test]
    fn explicit_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[generate]\ntarget = \"cpp\"\n").unwrap();
        let cfg = ShimgenConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.generate.target, Target::Cpp);

        assert!(ShimgenConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
