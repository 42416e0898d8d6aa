//! Build tool resolution
//!
//! The launcher never looks for the build tool itself. It asks a
//! [`ToolResolver`] for the executable and its invocation convention.

use camino::{Utf8Path, Utf8PathBuf};

use crate::request::BuildTool;
use crate::{Error, Result};

/// Resolved build tool executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    /// Path to the executable
    pub path: Utf8PathBuf,
    /// Invocation convention
    pub tool: BuildTool,
}

impl ResolvedTool {
    pub fn new(path: impl Into<Utf8PathBuf>, tool: BuildTool) -> Self {
        Self {
            path: path.into(),
            tool,
        }
    }
}

/// Locates the build tool for a launch
pub trait ToolResolver: Send + Sync {
    /// Find the build tool, or fail with [`Error::ToolNotFound`]
    fn resolve(&self) -> Result<ResolvedTool>;
}

/// Resolver returning a fixed, configured executable
#[derive(Debug, Clone)]
pub struct StaticResolver {
    resolved: ResolvedTool,
}

impl StaticResolver {
    pub fn new(path: impl Into<Utf8PathBuf>, tool: BuildTool) -> Self {
        Self {
            resolved: ResolvedTool::new(path, tool),
        }
    }
}

impl ToolResolver for StaticResolver {
    fn resolve(&self) -> Result<ResolvedTool> {
        if !self.resolved.path.is_file() {
            return Err(Error::tool_not_found(vec![self.resolved.path.clone()]));
        }
        Ok(self.resolved.clone())
    }
}

/// Resolver searching a list of directories, `PATH` by default
#[derive(Debug, Clone)]
pub struct SearchPathResolver {
    /// Directories searched, in order
    dirs: Vec<Utf8PathBuf>,
    /// Tool kinds tried, in order of preference
    prefer: Vec<BuildTool>,
}

impl SearchPathResolver {
    /// Search the directories of the `PATH` environment variable
    pub fn from_env() -> Self {
        let dirs = std::env::var_os("PATH")
            .map(|path| {
                std::env::split_paths(&path)
                    .filter_map(|p| Utf8PathBuf::try_from(p).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self::new(dirs)
    }

    /// Search the given directories
    pub fn new(dirs: Vec<Utf8PathBuf>) -> Self {
        Self {
            dirs,
            prefer: vec![BuildTool::DotnetCli, BuildTool::MsBuild],
        }
    }

    /// Search these directories before the others
    pub fn with_extra_dirs(mut self, extra: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        let mut dirs: Vec<_> = extra.into_iter().collect();
        dirs.append(&mut self.dirs);
        self.dirs = dirs;
        self
    }

    /// Set the order in which tool kinds are tried
    pub fn with_preference(mut self, prefer: Vec<BuildTool>) -> Self {
        if !prefer.is_empty() {
            self.prefer = prefer;
        }
        self
    }

    fn find_in(dir: &Utf8Path, tool: BuildTool) -> Option<Utf8PathBuf> {
        let candidate = dir.join(executable_name(tool));
        candidate.is_file().then_some(candidate)
    }
}

impl ToolResolver for SearchPathResolver {
    fn resolve(&self) -> Result<ResolvedTool> {
        for &tool in &self.prefer {
            for dir in &self.dirs {
                if let Some(path) = Self::find_in(dir, tool) {
                    tracing::debug!("Resolved {} at {}", tool, path);
                    return Ok(ResolvedTool::new(path, tool));
                }
            }
        }

        Err(Error::tool_not_found(self.dirs.clone()))
    }
}

#[cfg(windows)]
fn executable_name(tool: BuildTool) -> String {
    format!("{}.exe", tool.executable_stem())
}

#[cfg(not(windows))]
fn executable_name(tool: BuildTool) -> String {
    tool.executable_stem().to_string()
}
