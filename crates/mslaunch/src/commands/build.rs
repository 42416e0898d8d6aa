//! Build command implementation

use std::sync::Arc;

use camino::Utf8Path;
use clap::Args;
use miette::{IntoDiagnostic, Result};

use crate::build::{BuildLauncher, LineSink};

use super::RequestArgs;

/// Arguments for the build command
#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Wait for the build without the blocking timeout
    #[arg(long)]
    pub no_timeout: bool,
}

/// Run the build command, returning the build tool's exit code
pub fn run(project_dir: Option<&Utf8Path>, args: BuildArgs) -> Result<i32> {
    let (config, request) = args.request.resolve(project_dir)?;
    let launcher = BuildLauncher::new(config.resolver(), config.logger());

    std::fs::create_dir_all(&request.logs_dir_path).into_diagnostic()?;

    let on_stdout: LineSink = Arc::new(|line: &str| println!("{}", line));
    let on_stderr: LineSink = Arc::new(|line: &str| eprintln!("{}", line));

    let result = if args.no_timeout {
        let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
        rt.block_on(launcher.build_async(&request, Some(on_stdout), Some(on_stderr)))
    } else {
        launcher.build(&request, Some(on_stdout), Some(on_stderr))
    };
    let exit_code = result?;

    if exit_code == 0 {
        tracing::info!("Build succeeded");
    } else {
        tracing::error!("Build failed with exit code {}", exit_code);
    }

    Ok(exit_code)
}
