//! CLI subcommands

pub mod args;
pub mod build;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::Result;

use crate::config::Config;
use crate::request::{BuildRequest, BuildTool};

/// Request options shared by subcommands
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Solution or project file to build
    pub solution: Utf8PathBuf,

    /// Target to build (repeatable; default from config)
    #[arg(short, long = "target")]
    pub targets: Vec<String>,

    /// Build configuration (default from config)
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Restore dependencies before building
    #[arg(long)]
    pub restore: bool,

    /// Extra `key=value` property (repeatable)
    #[arg(short = 'p', long = "property")]
    pub properties: Vec<String>,

    /// Directory for build logger output
    #[arg(long)]
    pub logs_dir: Option<Utf8PathBuf>,

    /// Build tool executable, skipping the search
    #[arg(long)]
    pub tool: Option<Utf8PathBuf>,

    /// Invocation convention of --tool (msbuild, dotnet_cli)
    #[arg(long)]
    pub tool_kind: Option<BuildTool>,
}

impl RequestArgs {
    /// Load configuration and merge these options over it
    pub fn resolve(&self, project_dir: Option<&Utf8Path>) -> Result<(Config, BuildRequest)> {
        let project_dir = project_dir
            .map(Utf8Path::to_path_buf)
            .or_else(|| {
                self.solution
                    .parent()
                    .filter(|p| !p.as_str().is_empty())
                    .map(Utf8Path::to_path_buf)
            })
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let mut config = Config::load(&project_dir)?;

        if let Some(ref tool) = self.tool {
            config.tool.path = Some(tool.clone());
        }
        if let Some(kind) = self.tool_kind {
            config.tool.kind = kind;
        }
        if let Some(ref configuration) = self.configuration {
            config.build.configuration = configuration.clone();
        }
        if !self.targets.is_empty() {
            config.build.targets = self.targets.clone();
        }
        if let Some(ref logs_dir) = self.logs_dir {
            config.build.logs_dir = logs_dir.clone();
        }
        config.build.restore |= self.restore;
        config.build.properties.extend(self.properties.iter().cloned());

        let request = config.request(self.solution.clone(), &project_dir);
        Ok((config, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_args(solution: Utf8PathBuf) -> RequestArgs {
        RequestArgs {
            solution,
            targets: Vec::new(),
            configuration: None,
            restore: false,
            properties: Vec::new(),
            logs_dir: None,
            tool: None,
            tool_kind: None,
        }
    }

    #[test]
    fn test_resolve_uses_config_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        std::fs::write(
            project_dir.join("mslaunch.toml"),
            "[build]\nconfiguration = \"Release\"\nproperties = [\"A=1\"]\n",
        )
        .unwrap();

        let args = request_args(project_dir.join("App.sln"));
        let (_, request) = args.resolve(None).unwrap();

        assert_eq!(request.configuration, "Release");
        assert_eq!(request.targets, vec!["Build"]);
        assert_eq!(request.custom_properties, vec!["A=1"]);
        assert_eq!(request.logs_dir_path, project_dir.join(".mslaunch/logs"));
    }

    #[test]
    fn test_resolve_cli_overrides_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        std::fs::write(
            project_dir.join("mslaunch.toml"),
            "[build]\nconfiguration = \"Release\"\nproperties = [\"A=1\"]\n",
        )
        .unwrap();

        let mut args = request_args(Utf8PathBuf::from("/elsewhere/App.sln"));
        args.configuration = Some("Debug".to_string());
        args.targets = vec!["Clean".to_string(), "Build".to_string()];
        args.restore = true;
        args.properties = vec!["B=2".to_string()];
        args.tool = Some(Utf8PathBuf::from("/usr/bin/dotnet"));
        args.tool_kind = Some(BuildTool::DotnetCli);

        let (config, request) = args.resolve(Some(project_dir)).unwrap();

        assert_eq!(request.configuration, "Debug");
        assert_eq!(request.targets, vec!["Clean", "Build"]);
        assert!(request.restore);
        assert_eq!(request.custom_properties, vec!["A=1", "B=2"]);
        assert_eq!(config.tool.path, Some(Utf8PathBuf::from("/usr/bin/dotnet")));
        assert_eq!(config.tool.kind, BuildTool::DotnetCli);
    }
}
