mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "coresep", version, about = "Discover command modules and generate their glue")]
struct Cli {
    /// Project root; option paths are resolved against it
    #[arg(short = 'r', long = "root", global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Options file (defaults to <root>/coresep.toml when present)
    #[arg(short = 'c', long = "config", global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Overrides applied on top of the options file.
#[derive(clap::Args, Clone, Debug, Default)]
pub(crate) struct OptionArgs {
    /// Commands root relative to the project root
    #[arg(long = "commands-dir", value_name = "DIR")]
    pub(crate) commands_dir: Option<PathBuf>,
    /// Output directory relative to the project root
    #[arg(long = "out-dir", value_name = "DIR")]
    pub(crate) out_dir: Option<PathBuf>,
    /// Library namespace
    #[arg(long = "namespace")]
    pub(crate) namespace: Option<String>,
    /// Skip the types.rs signature map
    #[arg(long = "no-types")]
    pub(crate) no_types: bool,
    /// Empty the output directory before the first pass
    #[arg(long = "clear")]
    pub(crate) clear: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every command file and write the glue once
    Generate {
        #[command(flatten)]
        options: OptionArgs,
        /// Print the artifacts that would be written without touching the disk
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Generate, then regenerate on every change under the commands root
    Watch {
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Print the namespace map
    List {
        #[command(flatten)]
        options: OptionArgs,
        /// Emit JSON instead of text
        #[arg(long = "json")]
        json: bool,
    },
    /// Resolve only; fails on duplicate commands or unreadable files
    Check {
        #[command(flatten)]
        options: OptionArgs,
    },
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("coresep=debug")
        } else {
            EnvFilter::new("coresep=info")
        }
    });
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = commands::project_root(cli.root.as_deref())?;
    let config = cli.config.as_deref();

    match cli.command {
        Command::Generate { options, dry_run } => {
            let options = commands::load_options(&root, config, &options, cli.verbose)?;
            commands::cmd_generate(&root, options, dry_run)
        }
        Command::Watch { options } => {
            let options = commands::load_options(&root, config, &options, cli.verbose)?;
            commands::cmd_watch(&root, options)
        }
        Command::List { options, json } => {
            let options = commands::load_options(&root, config, &options, cli.verbose)?;
            commands::cmd_list(&root, options, json)
        }
        Command::Check { options } => {
            let options = commands::load_options(&root, config, &options, cli.verbose)?;
            commands::cmd_check(&root, options)
        }
    }
}
