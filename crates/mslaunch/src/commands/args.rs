//! Args command implementation
//!
//! Prints the command line a build would run, without running it.

use camino::Utf8Path;
use clap::Args;
use miette::Result;

use crate::build::BuildLauncher;

use super::RequestArgs;

/// Arguments for the args command
#[derive(Debug, Args)]
pub struct ArgsArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Run the args command
pub fn run(project_dir: Option<&Utf8Path>, args: ArgsArgs) -> Result<()> {
    let (config, request) = args.request.resolve(project_dir)?;
    let launcher = BuildLauncher::new(config.resolver(), config.logger());

    let (resolved, arguments) = launcher.arguments(&request)?;
    println!("\"{}\" {}", resolved.path, arguments);

    Ok(())
}
