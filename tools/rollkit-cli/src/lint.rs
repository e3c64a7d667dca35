//! lint command - parse and resolve scripts
//!
//! Each file's directory is searched for includes, after any `-I` paths and
//! the configured include paths.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use rollkit_script::{Context, Severity};
use rollkit_shared::Config;

/// Arguments for the lint command
#[derive(Args)]
pub struct LintArgs {
    /// Script files (`.nss`)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Extra include directories
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

pub fn execute(args: LintArgs, config: &Config) -> Result<()> {
    let mut include = args.include.clone();
    for file in &args.files {
        if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !include.iter().any(|p| p == dir) {
                include.push(dir.to_path_buf());
            }
        }
    }

    let mut ctx = Context::new(config, &include);
    let errors = Rc::new(Cell::new(0usize));
    let warnings = Rc::new(Cell::new(0usize));
    {
        let (errors, warnings) = (errors.clone(), warnings.clone());
        ctx.set_diagnostic_sink(move |diag| {
            match diag.severity {
                Severity::Error => errors.set(errors.get() + 1),
                Severity::Warning => warnings.set(warnings.get() + 1),
                Severity::Information | Severity::Hint => {}
            }
            eprintln!("{diag}");
        });
    }

    for file in &args.files {
        let name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("invalid script name {}", file.display()))?;
        let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        let id = ctx.parse_source(name, text);
        ctx.resolve(id);
    }

    let (errors, warnings) = (errors.get(), warnings.get());
    tracing::info!(files = args.files.len(), errors, warnings, "lint finished");
    if errors > 0 || (args.deny_warnings && warnings > 0) {
        bail!("{errors} error(s), {warnings} warning(s)");
    }
    Ok(())
}
