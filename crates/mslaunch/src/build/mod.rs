//! Build tool launching and supervision
//!
//! This module provides the build functionality for mslaunch, including:
//! - Launching the resolved build tool with rendered arguments
//! - Line-by-line relay of the tool's stdout and stderr
//! - Blocking (with timeout) and async completion paths

mod launcher;
mod output;
mod process;

pub use launcher::{BuildLauncher, DEFAULT_BUILD_TIMEOUT};
pub use output::{LineSink, OutputStream, channel_sink};
pub use process::{BuildProcess, BuildState, OUTPUT_DRAIN_GRACE};
