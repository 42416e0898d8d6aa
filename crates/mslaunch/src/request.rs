//! Build request and build tool representation
//!
//! A [`BuildRequest`] describes one invocation of the build tool. It is owned by
//! the caller and is not modified while a build runs.

use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Invocation convention of the resolved build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BuildTool {
    /// Standalone MSBuild executable
    #[default]
    #[serde(rename = "msbuild")]
    MsBuild,
    /// `dotnet` front end, which needs the `msbuild` verb
    #[serde(rename = "dotnet_cli")]
    DotnetCli,
}

impl BuildTool {
    /// Verb that must precede the build arguments, if any
    pub fn verb(self) -> Option<&'static str> {
        match self {
            BuildTool::MsBuild => None,
            BuildTool::DotnetCli => Some("msbuild"),
        }
    }

    /// Executable stem searched for on disk
    pub fn executable_stem(self) -> &'static str {
        match self {
            BuildTool::MsBuild => "msbuild",
            BuildTool::DotnetCli => "dotnet",
        }
    }
}

impl FromStr for BuildTool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "msbuild" => Ok(BuildTool::MsBuild),
            "dotnet_cli" | "dotnet-cli" | "dotnet" => Ok(BuildTool::DotnetCli),
            other => Err(Error::config(
                format!("Unknown build tool kind: {}", other),
                "Expected one of: msbuild, dotnet_cli",
            )),
        }
    }
}

impl std::fmt::Display for BuildTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildTool::MsBuild => write!(f, "msbuild"),
            BuildTool::DotnetCli => write!(f, "dotnet_cli"),
        }
    }
}

/// One build of a project or solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Path to the project or solution file
    pub solution_path: Utf8PathBuf,

    /// Targets to build, in order
    pub targets: Vec<String>,

    /// Build configuration name (e.g. "Debug")
    pub configuration: String,

    /// Run the restore step before building
    pub restore: bool,

    /// Extra `key=value` properties passed verbatim
    pub custom_properties: Vec<String>,

    /// Directory where the build logger writes its logs
    pub logs_dir_path: Utf8PathBuf,
}

impl BuildRequest {
    /// Create a request that builds the `Build` target
    pub fn new(
        solution_path: impl Into<Utf8PathBuf>,
        configuration: impl Into<String>,
        logs_dir_path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            solution_path: solution_path.into(),
            targets: vec!["Build".to_string()],
            configuration: configuration.into(),
            restore: false,
            custom_properties: Vec::new(),
            logs_dir_path: logs_dir_path.into(),
        }
    }

    /// Replace the target list
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the restore step
    pub fn with_restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    /// Append one `key=value` property
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.custom_properties.push(property.into());
        self
    }

    /// Append several `key=value` properties, keeping their order
    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// Path to the project or solution file
    pub fn solution(&self) -> &Utf8Path {
        &self.solution_path
    }

    /// Check that the request can be rendered into a meaningful command line
    ///
    /// An empty target list would render as a bare `/t:` which the tool rejects
    /// with an unhelpful message, so it is refused here instead.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::invalid_request(
                "No build targets given",
                "Pass at least one target, e.g. \"Build\"",
            ));
        }

        if let Some(pos) = self.targets.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::invalid_request(
                format!("Target #{} is empty", pos + 1),
                "Remove the empty entry from the target list",
            ));
        }

        if self.solution_path.as_str().is_empty() {
            return Err(Error::invalid_request(
                "No solution path given",
                "Pass the path of the .sln or project file to build",
            ));
        }

        Ok(())
    }
}
