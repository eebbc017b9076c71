//! Generates the shims under `specs/` into `OUT_DIR`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shimgen_codegen::{generate, GenerateOptions, Source, SourceFormat};

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").context("OUT_DIR not set")?);
    let specs = Path::new("specs");
    println!("cargo:rerun-if-changed=specs");

    let mut paths = std::fs::read_dir(specs)
        .context("reading specs/")?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let artifact = generate(
            Source::text(&text, SourceFormat::from_path(&path)),
            &GenerateOptions::default(),
        )
        .with_context(|| format!("generating {}", path.display()))?;

        std::fs::write(out_dir.join(format!("{stem}.rs")), artifact.render())
            .with_context(|| format!("writing shim for {}", path.display()))?;
    }
    Ok(())
}
