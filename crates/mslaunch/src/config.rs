//! Configuration file parsing and merging
//!
//! This module handles parsing of `mslaunch.toml` and `mslaunch.local.toml`
//! files found next to the project being built. The local file overrides the
//! shared one.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::arguments::LoggerSpec;
use crate::request::{BuildRequest, BuildTool};
use crate::resolver::{SearchPathResolver, StaticResolver, ToolResolver};

/// Shared configuration file name
pub const CONFIG_FILE: &str = "mslaunch.toml";

/// Per-developer override file name
pub const LOCAL_CONFIG_FILE: &str = "mslaunch.local.toml";

/// Main configuration structure for mslaunch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build tool selection
    pub tool: ToolConfig,

    /// Build logger registration
    pub logger: LoggerSpec,

    /// Build request defaults
    pub build: BuildConfig,
}

/// Build tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Explicit executable path; disables the search when set
    pub path: Option<Utf8PathBuf>,

    /// Invocation convention of `path` (default: msbuild)
    pub kind: BuildTool,

    /// Directories searched before `PATH`
    pub search_dirs: Vec<Utf8PathBuf>,

    /// Order in which tool kinds are searched (default: dotnet_cli, msbuild)
    pub prefer: Vec<BuildTool>,
}

/// Defaults for build requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build configuration name (default: "Debug")
    pub configuration: String,

    /// Targets to build (default: ["Build"])
    pub targets: Vec<String>,

    /// Run restore before building (default: false)
    pub restore: bool,

    /// Extra `key=value` properties
    pub properties: Vec<String>,

    /// Logs directory, relative to the project directory (default: ".mslaunch/logs")
    pub logs_dir: Utf8PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            configuration: "Debug".to_string(),
            targets: vec!["Build".to_string()],
            restore: false,
            properties: Vec::new(),
            logs_dir: Utf8PathBuf::from(".mslaunch/logs"),
        }
    }
}

impl Config {
    /// Load configuration from a project directory.
    ///
    /// This loads `mslaunch.toml` and merges `mslaunch.local.toml` if it exists.
    /// Missing files yield the defaults.
    pub fn load(project_dir: &Utf8Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        let local_config_path = project_dir.join(LOCAL_CONFIG_FILE);

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let merged = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            merge_toml_values(base_config, toml::from_str::<toml::Value>(&content)?)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;
        tracing::debug!("Loaded configuration from {}", project_dir);

        Ok(config)
    }

    /// Load configuration from a string (for testing)
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Build the tool resolver described by `[tool]`
    pub fn resolver(&self) -> Arc<dyn ToolResolver> {
        match &self.tool.path {
            Some(path) => Arc::new(StaticResolver::new(path.clone(), self.tool.kind)),
            None => Arc::new(
                SearchPathResolver::from_env()
                    .with_extra_dirs(self.tool.search_dirs.iter().cloned())
                    .with_preference(self.tool.prefer.clone()),
            ),
        }
    }

    /// Logger registered with every build
    pub fn logger(&self) -> LoggerSpec {
        self.logger.clone()
    }

    /// Create a request for `solution` using the `[build]` defaults
    ///
    /// A relative logs directory is resolved against `project_dir`.
    pub fn request(&self, solution: impl Into<Utf8PathBuf>, project_dir: &Utf8Path) -> BuildRequest {
        let logs_dir = if self.build.logs_dir.is_absolute() {
            self.build.logs_dir.clone()
        } else {
            project_dir.join(&self.build.logs_dir)
        };

        BuildRequest::new(solution, self.build.configuration.clone(), logs_dir)
            .with_targets(self.build.targets.iter().cloned())
            .with_restore(self.build.restore)
            .with_properties(self.build.properties.iter().cloned())
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                let merged = match base_table.remove(&key) {
                    Some(base_value) => merge_toml_values(base_value, local_value),
                    None => local_value,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}
