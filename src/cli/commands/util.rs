use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use coresep::GlueOptions;

use crate::cli::OptionArgs;

pub(crate) fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    let root = match root {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("failed to read the current directory")?,
    };
    if !root.is_dir() {
        bail!("project root {} is not a directory", root.display());
    }
    root.canonicalize()
        .with_context(|| format!("failed to resolve {}", root.display()))
}

/// Options file merged with command-line overrides.
pub(crate) fn load_options(
    root: &Path,
    config: Option<&Path>,
    args: &OptionArgs,
    verbose: bool,
) -> Result<GlueOptions> {
    let mut options = GlueOptions::discover(root, config)?;
    if let Some(dir) = &args.commands_dir {
        options.commands_dir = dir.clone();
    }
    if let Some(dir) = &args.out_dir {
        options.out_dir = dir.clone();
    }
    if let Some(namespace) = &args.namespace {
        options.namespace = namespace.clone();
    }
    if args.no_types {
        options.emit_types = false;
    }
    if args.clear {
        options.clear_out_dir = true;
    }
    options.verbose |= verbose;
    Ok(options)
}
