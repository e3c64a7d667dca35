//! gff2json / json2gff commands

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use rollkit_gff::Gff;
use rollkit_shared::Config;

/// Arguments for the gff2json command
#[derive(Args)]
pub struct Gff2JsonArgs {
    /// GFF file to convert
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the json2gff command
#[derive(Args)]
pub struct Json2GffArgs {
    /// JSON file produced by gff2json
    pub input: PathBuf,

    /// Output file (defaults to the input path without `.json`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn gff_to_json(args: Gff2JsonArgs, config: &Config) -> Result<()> {
    let gff = Gff::from_file(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?
        .with_language(config.language());
    let json = rollkit_gff::gff_to_json(&gff);
    let text = serde_json::to_string_pretty(&json)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote json");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}

pub fn json_to_gff(args: Json2GffArgs, config: &Config) -> Result<()> {
    let output = match args.output {
        Some(path) => path,
        None => default_gff_path(&args.input)?,
    };

    let text =
        std::fs::read_to_string(&args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid json", args.input.display()))?;

    let mut builder = rollkit_gff::json_to_gff(&json)?
        .with_language(config.language())
        .with_max_resref_len(config.max_resref_len());
    builder.build()?;
    builder
        .write_to(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), bytes = builder.to_bytes().len(), "wrote gff");
    Ok(())
}

/// `foo.utc.json` becomes `foo.utc`.
fn default_gff_path(input: &Path) -> Result<PathBuf> {
    match input.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(input.with_extension("")),
        _ => bail!("cannot derive an output name from {}; pass --output", input.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gff_path() {
        assert_eq!(
            default_gff_path(Path::new("dir/nw_chicken.utc.json")).unwrap(),
            PathBuf::from("dir/nw_chicken.utc")
        );
        assert!(default_gff_path(Path::new("nw_chicken.utc")).is_err());
    }
}
