//! mslaunch CLI - MSBuild launcher

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mslaunch::commands;

/// mslaunch - run MSBuild-compatible build tools
#[derive(Debug, Parser)]
#[command(name = "mslaunch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding mslaunch.toml (default: the solution's directory)
    #[arg(short = 'C', long, global = true)]
    project_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a solution or project
    Build(commands::build::BuildArgs),

    /// Print the build tool command line without running it
    Args(commands::args::ArgsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let project_dir = cli.project_dir.as_deref();

    match cli.command {
        Commands::Build(args) => {
            let exit_code = commands::build::run(project_dir, args)?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
        Commands::Args(args) => commands::args::run(project_dir, args),
    }
}
