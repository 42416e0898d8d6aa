//! mslaunch - MSBuild launcher
//!
//! This crate provides both a library and CLI for launching MSBuild-compatible
//! build tools, including:
//! - Command-line construction from a build request
//! - Build tool resolution (explicit path or `PATH` search)
//! - Environment sanitization for the child process
//! - Subprocess supervision with line-by-line output relay
//! - Configuration file parsing and merging

pub mod arguments;
pub mod build;
pub mod commands;
pub mod config;
pub mod environment;
pub mod error;
pub mod request;
pub mod resolver;

pub use arguments::{BuildArguments, LoggerSpec};
pub use build::{BuildLauncher, BuildProcess, BuildState, LineSink};
pub use error::{Error, Result};
pub use request::{BuildRequest, BuildTool};
pub use resolver::{ResolvedTool, SearchPathResolver, StaticResolver, ToolResolver};
