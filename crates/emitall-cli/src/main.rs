#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::cast_possible_truncation)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "emitall")]
#[command(author, version, about = "Emit every module of a build as its own file", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Write one file per module described by a build manifest
    Emit {
        /// Build manifest (JSON)
        manifest: PathBuf,

        /// Config file (default: emitall.config.json or .emitallrc.json in the working directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Regex of module paths not to emit
        #[arg(long, value_name = "REGEX")]
        ignore_pattern: Option<String>,

        /// Skip modules marked external
        #[arg(long)]
        ignore_externals: bool,

        /// Output directory for emitted modules (default: the manifest's outputPath)
        #[arg(long, value_name = "PATH")]
        out_dir: Option<PathBuf>,

        /// Report what would be written without touching the disk
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Emit {
            manifest,
            config,
            ignore_pattern,
            ignore_externals,
            out_dir,
            dry_run,
        }) => {
            let span = tracing::info_span!("emit", cmd = "emit", cwd = %cwd.display());
            let _guard = span.enter();
            let action = commands::emit::EmitAction {
                manifest,
                cwd,
                config,
                ignore_pattern,
                ignore_externals,
                out_dir,
                dry_run,
            };
            commands::emit::run(action, cli.json)
        }
    }
}
