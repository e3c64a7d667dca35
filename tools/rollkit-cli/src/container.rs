//! ls / extract commands

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Args;
use rollkit_resources::{Container, open_container};
use rollkit_shared::Resource;

/// Arguments for the ls command
#[derive(Args)]
pub struct LsArgs {
    /// Directory, erf, key, zip or nwsync path
    pub container: PathBuf,

    /// Only list entries matching this glob
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the extract command
#[derive(Args)]
pub struct ExtractArgs {
    /// Directory, erf, key, zip or nwsync path
    pub container: PathBuf,

    /// Glob over `name.ext`
    #[arg(default_value = "*")]
    pub pattern: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

fn open(path: &Path) -> Result<Box<dyn Container>> {
    match open_container(path) {
        Some(container) if container.valid() => Ok(container),
        _ => bail!("{} is not a readable container", path.display()),
    }
}

pub fn list(args: LsArgs) -> Result<()> {
    let container = open(&args.container)?;
    let matcher = match &args.filter {
        Some(pattern) => Some(globset::Glob::new(pattern)?.compile_matcher()),
        None => None,
    };

    let mut entries: Vec<(Resource, usize)> = Vec::new();
    container.visit(&mut |res, key| {
        if matcher.as_ref().is_some_and(|m| !m.is_match(res.filename())) {
            return;
        }
        let size = container.stat(key).map_or(0, |d| d.size);
        entries.push((res, size));
    });
    entries.sort_by_key(|(res, _)| res.filename());

    let mut stdout = std::io::stdout().lock();
    for (res, size) in &entries {
        writeln!(stdout, "{:>10}  {}", size, res.filename())?;
    }
    tracing::debug!(container = container.name(), entries = entries.len(), "listed");
    Ok(())
}

pub fn extract(args: ExtractArgs) -> Result<()> {
    let container = open(&args.container)?;
    let count = container.extract_by_glob(&args.pattern, &args.output);
    tracing::info!(
        container = container.name(),
        output = %args.output.display(),
        count,
        "extracted"
    );
    Ok(())
}
